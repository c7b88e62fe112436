//! File-based SessionRepository implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use combat_core::{CampaignId, CombatConfig, CombatSession, SessionId};

use crate::repository::error::validate_key;
use crate::repository::{HistorySummary, RepositoryError, Result, SessionRecord, SessionRepository};

const ACTIVE_DIR: &str = "active";
const HISTORY_DIR: &str = "history";
const ACTIVE_PREFIX: &str = "combat_";
const HISTORY_STAMP: &str = "%Y%m%dT%H%M%SZ";

/// File-based implementation of SessionRepository.
///
/// # Layout
///
/// ```text
/// {base_dir}/{campaign_id}/active/combat_{session_id}.json
/// {base_dir}/{campaign_id}/history/{YYYYMMDDTHHMMSSZ}_{session_id}.json
/// ```
///
/// Every write goes to a temp file first and is renamed into place.
pub struct FileSessionRepository {
    base_dir: PathBuf,
    log_tail_limit: usize,
}

impl FileSessionRepository {
    /// Create a new file-based session repository.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(RepositoryError::Io)?;
        Ok(Self {
            base_dir,
            log_tail_limit: CombatConfig::DEFAULT_LOG_TAIL_LIMIT,
        })
    }

    /// Number of log entries kept per stored record.
    pub fn with_log_tail_limit(mut self, limit: usize) -> Self {
        self.log_tail_limit = limit;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn campaign_dir(&self, campaign_id: &str) -> Result<PathBuf> {
        validate_key("campaign id", campaign_id)?;
        Ok(self.base_dir.join(campaign_id))
    }

    fn active_dir(&self, campaign_id: &str) -> Result<PathBuf> {
        Ok(self.campaign_dir(campaign_id)?.join(ACTIVE_DIR))
    }

    fn history_dir(&self, campaign_id: &str) -> Result<PathBuf> {
        Ok(self.campaign_dir(campaign_id)?.join(HISTORY_DIR))
    }

    /// Get the path to an active record.
    pub fn active_path(&self, campaign_id: &str, session_id: &str) -> Result<PathBuf> {
        validate_key("session id", session_id)?;
        Ok(self
            .active_dir(campaign_id)?
            .join(format!("{ACTIVE_PREFIX}{session_id}.json")))
    }

    fn write_atomic(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(RepositoryError::Io)?;
        }
        let temp_path = path.with_extension("json.tmp");

        // Write to temp file
        fs::write(&temp_path, contents).map_err(RepositoryError::Io)?;

        // Atomic rename
        fs::rename(&temp_path, path).map_err(RepositoryError::Io)?;
        Ok(())
    }

    fn read_record(path: &Path) -> Result<SessionRecord> {
        let json = fs::read_to_string(path).map_err(RepositoryError::Io)?;
        SessionRecord::from_json(&json, &path.display().to_string())
    }

    /// Active record files with their modification times.
    fn active_files(&self, campaign_id: &str) -> Result<Vec<(SessionId, PathBuf, SystemTime)>> {
        let dir = self.active_dir(campaign_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(RepositoryError::Io)? {
            let entry = entry.map_err(RepositoryError::Io)?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(session_id) = filename
                    .strip_prefix(ACTIVE_PREFIX)
                    .and_then(|s| s.strip_suffix(".json"))
            {
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                files.push((session_id.to_string(), path, modified));
            }
        }
        Ok(files)
    }

    /// History record files paired with the session id from their name.
    fn history_files(&self, campaign_id: &str) -> Result<Vec<(SessionId, PathBuf)>> {
        let dir = self.history_dir(campaign_id)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&dir).map_err(RepositoryError::Io)? {
            let entry = entry.map_err(RepositoryError::Io)?;
            let path = entry.path();

            if let Some(filename) = path.file_name().and_then(|s| s.to_str())
                && let Some(stem) = filename.strip_suffix(".json")
                && let Some((_stamp, session_id)) = stem.split_once('_')
            {
                files.push((session_id.to_string(), path));
            }
        }
        // Timestamp prefix sorts chronologically.
        files.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(files)
    }
}

impl SessionRepository for FileSessionRepository {
    fn save(&self, campaign_id: &str, session: &CombatSession) -> Result<()> {
        let path = self.active_path(campaign_id, &session.session_id)?;
        let record = SessionRecord::active(campaign_id, session, Utc::now(), self.log_tail_limit);

        Self::write_atomic(&path, &record.to_json()?)?;

        tracing::debug!(
            "Saved session {} (round {}) to {}",
            session.session_id,
            session.round_number,
            path.display()
        );
        Ok(())
    }

    fn load_active(&self, campaign_id: &str) -> Result<Option<CombatSession>> {
        let mut files = self.active_files(campaign_id)?;
        if files.len() > 1 {
            tracing::warn!(
                "Campaign {} has {} active combat records; using the most recent",
                campaign_id,
                files.len()
            );
        }
        files.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.0.cmp(&a.0)));

        let Some((_, path, _)) = files.into_iter().next() else {
            return Ok(None);
        };
        let record = Self::read_record(&path)?;

        tracing::debug!("Loaded active session {} from {}", record.session_id(), path.display());
        Ok(Some(record.session))
    }

    fn load_by_id(&self, campaign_id: &str, session_id: &str) -> Result<Option<CombatSession>> {
        let path = self.active_path(campaign_id, session_id)?;

        if !path.exists() {
            return Ok(None);
        }

        let record = Self::read_record(&path)?;
        Ok(Some(record.session))
    }

    fn load_history(&self, campaign_id: &str, session_id: &str) -> Result<Option<SessionRecord>> {
        validate_key("session id", session_id)?;
        let Some((_, path)) = self
            .history_files(campaign_id)?
            .into_iter()
            .find(|(id, _)| id == session_id)
        else {
            return Ok(None);
        };
        Self::read_record(&path).map(Some)
    }

    fn archive(&self, campaign_id: &str, session: &CombatSession) -> Result<HistorySummary> {
        let active_path = self.active_path(campaign_id, &session.session_id)?;
        let archived_at = Utc::now();
        let record =
            SessionRecord::archived(campaign_id, session, archived_at, self.log_tail_limit);
        let history_path = self.history_dir(campaign_id)?.join(format!(
            "{}_{}.json",
            archived_at.format(HISTORY_STAMP),
            session.session_id
        ));

        Self::write_atomic(&history_path, &record.to_json()?)?;

        if active_path.exists()
            && let Err(source) = fs::remove_file(&active_path)
        {
            // Roll back so the session is not in both tiers.
            if let Err(err) = fs::remove_file(&history_path) {
                tracing::error!(
                    "Failed to roll back history record {}: {}",
                    history_path.display(),
                    err
                );
            }
            return Err(RepositoryError::ArchiveIncomplete {
                session_id: session.session_id.clone(),
                source,
            });
        }

        tracing::info!(
            "Archived session {} to {}",
            session.session_id,
            history_path.display()
        );
        Ok(record.summary())
    }

    fn list_active(&self, campaign_id: &str) -> Result<Vec<SessionId>> {
        let mut ids: Vec<SessionId> = self
            .active_files(campaign_id)?
            .into_iter()
            .map(|(id, _, _)| id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn list_history(&self, campaign_id: &str) -> Result<Vec<HistorySummary>> {
        let mut summaries = Vec::new();

        for (_, path) in self.history_files(campaign_id)? {
            match Self::read_record(&path) {
                Ok(record) => summaries.push(record.summary()),
                Err(err) => {
                    tracing::warn!("Skipping unreadable history record {}: {}", path.display(), err)
                }
            }
        }

        summaries.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
        Ok(summaries)
    }

    fn delete_active(&self, campaign_id: &str, session_id: &str) -> Result<bool> {
        let path = self.active_path(campaign_id, session_id)?;

        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(RepositoryError::Io)?;
        tracing::info!("Deleted active session record: {}", path.display());
        Ok(true)
    }

    fn list_campaigns(&self) -> Result<Vec<CampaignId>> {
        let mut campaigns = Vec::new();

        for entry in fs::read_dir(&self.base_dir).map_err(RepositoryError::Io)? {
            let entry = entry.map_err(RepositoryError::Io)?;
            if entry.file_type().map_err(RepositoryError::Io)?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                campaigns.push(name.to_string());
            }
        }

        campaigns.sort();
        Ok(campaigns)
    }
}
