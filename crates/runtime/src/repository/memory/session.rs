//! In-memory SessionRepository implementation for tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use combat_core::{CampaignId, CombatConfig, CombatSession, SessionId};

use crate::repository::error::validate_key;
use crate::repository::{HistorySummary, RepositoryError, Result, SessionRecord, SessionRepository};

#[derive(Default)]
struct CampaignStore {
    /// Active records with the save sequence number that wrote them.
    active: HashMap<SessionId, (u64, SessionRecord)>,
    history: Vec<SessionRecord>,
}

#[derive(Default)]
struct Store {
    campaigns: HashMap<CampaignId, CampaignStore>,
    sequence: u64,
}

/// In-memory implementation of SessionRepository.
///
/// Keeps the same records the file repository would write, so log trimming
/// and archive bookkeeping behave identically.
pub struct InMemorySessionRepo {
    store: RwLock<Store>,
    log_tail_limit: usize,
}

impl InMemorySessionRepo {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store::default()),
            log_tail_limit: CombatConfig::DEFAULT_LOG_TAIL_LIMIT,
        }
    }

    pub fn with_log_tail_limit(mut self, limit: usize) -> Self {
        self.log_tail_limit = limit;
        self
    }
}

impl Default for InMemorySessionRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRepository for InMemorySessionRepo {
    fn save(&self, campaign_id: &str, session: &CombatSession) -> Result<()> {
        validate_key("campaign id", campaign_id)?;
        validate_key("session id", &session.session_id)?;
        let record = SessionRecord::active(campaign_id, session, Utc::now(), self.log_tail_limit);

        let mut store = self
            .store
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        store.sequence += 1;
        let sequence = store.sequence;
        store
            .campaigns
            .entry(campaign_id.to_string())
            .or_default()
            .active
            .insert(session.session_id.clone(), (sequence, record));
        Ok(())
    }

    fn load_active(&self, campaign_id: &str) -> Result<Option<CombatSession>> {
        let store = self
            .store
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let Some(campaign) = store.campaigns.get(campaign_id) else {
            return Ok(None);
        };
        if campaign.active.len() > 1 {
            tracing::warn!(
                "Campaign {} has {} active combat records; using the most recent",
                campaign_id,
                campaign.active.len()
            );
        }
        Ok(campaign
            .active
            .values()
            .max_by_key(|(sequence, _)| *sequence)
            .map(|(_, record)| record.session.clone()))
    }

    fn load_by_id(&self, campaign_id: &str, session_id: &str) -> Result<Option<CombatSession>> {
        let store = self
            .store
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(store
            .campaigns
            .get(campaign_id)
            .and_then(|c| c.active.get(session_id))
            .map(|(_, record)| record.session.clone()))
    }

    fn load_history(&self, campaign_id: &str, session_id: &str) -> Result<Option<SessionRecord>> {
        let store = self
            .store
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(store.campaigns.get(campaign_id).and_then(|c| {
            c.history
                .iter()
                .rev()
                .find(|record| record.session_id() == session_id)
                .cloned()
        }))
    }

    fn archive(&self, campaign_id: &str, session: &CombatSession) -> Result<HistorySummary> {
        validate_key("campaign id", campaign_id)?;
        validate_key("session id", &session.session_id)?;
        let record =
            SessionRecord::archived(campaign_id, session, Utc::now(), self.log_tail_limit);
        let summary = record.summary();

        let mut store = self
            .store
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let campaign = store.campaigns.entry(campaign_id.to_string()).or_default();
        campaign.active.remove(&session.session_id);
        campaign.history.push(record);
        Ok(summary)
    }

    fn list_active(&self, campaign_id: &str) -> Result<Vec<SessionId>> {
        let store = self
            .store
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut ids: Vec<SessionId> = store
            .campaigns
            .get(campaign_id)
            .map(|c| c.active.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        Ok(ids)
    }

    fn list_history(&self, campaign_id: &str) -> Result<Vec<HistorySummary>> {
        let store = self
            .store
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut summaries: Vec<HistorySummary> = store
            .campaigns
            .get(campaign_id)
            .map(|c| c.history.iter().rev().map(SessionRecord::summary).collect())
            .unwrap_or_default();
        // Stable sort keeps archive order for equal timestamps.
        summaries.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
        Ok(summaries)
    }

    fn delete_active(&self, campaign_id: &str, session_id: &str) -> Result<bool> {
        let mut store = self
            .store
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(store
            .campaigns
            .get_mut(campaign_id)
            .and_then(|c| c.active.remove(session_id))
            .is_some())
    }

    fn list_campaigns(&self) -> Result<Vec<CampaignId>> {
        let store = self
            .store
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let mut campaigns: Vec<CampaignId> = store.campaigns.keys().cloned().collect();
        campaigns.sort();
        Ok(campaigns)
    }
}
