//! Persisted session record.
//!
//! A record is the session's own fields plus bookkeeping, flattened into one
//! self-describing JSON document:
//!
//! ```json
//! {
//!   "campaign_id": "c-1",
//!   "schema_version": 2,
//!   "last_saved": "2026-03-14T09:30:00Z",
//!   "session_id": "…",
//!   "turn_order": ["hero", "goblin"],
//!   …
//! }
//! ```
//!
//! Active records carry `last_saved`; history records carry `archived_at` and
//! `duration_seconds`.

use chrono::{DateTime, Utc};
use combat_core::{CampaignId, CombatOutcome, CombatSession, SessionId, SessionStatus};
use serde::{Deserialize, Serialize};

use super::decode;
use super::error::{RepositoryError, Result};

/// Current record layout. Older records decode with defaults for new fields.
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub campaign_id: CampaignId,
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(flatten)]
    pub session: CombatSession,
}

impl SessionRecord {
    /// Record for the active tier. The log is trimmed to its last
    /// `log_tail_limit` entries; the caller's session is not modified.
    pub fn active(
        campaign_id: &str,
        session: &CombatSession,
        saved_at: DateTime<Utc>,
        log_tail_limit: usize,
    ) -> Self {
        let mut session = session.clone();
        session.trim_log(log_tail_limit);
        Self {
            campaign_id: campaign_id.to_string(),
            schema_version: SCHEMA_VERSION,
            last_saved: Some(saved_at),
            archived_at: None,
            duration_seconds: None,
            session,
        }
    }

    /// Record for the history tier.
    pub fn archived(
        campaign_id: &str,
        session: &CombatSession,
        archived_at: DateTime<Utc>,
        log_tail_limit: usize,
    ) -> Self {
        let mut record = Self::active(campaign_id, session, archived_at, log_tail_limit);
        record.last_saved = None;
        record.archived_at = Some(archived_at);
        record.duration_seconds = Some((archived_at - session.created_at).num_seconds().max(0));
        record
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session.session_id
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RepositoryError::Json(e.to_string()))
    }

    /// Decodes a record, tolerating schema drift.
    ///
    /// `origin` names the source (usually a file path) in warnings.
    pub fn from_json(text: &str, origin: &str) -> Result<Self> {
        decode::decode_record(text, origin)
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary::from(self)
    }
}

/// Lightweight listing entry for a finished session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub session_id: SessionId,
    pub scene_id: String,
    pub status: SessionStatus,
    pub outcome: Option<CombatOutcome>,
    pub round_number: u32,
    pub combatant_count: usize,
    pub archived_at: DateTime<Utc>,
    pub duration_seconds: i64,
}

impl From<&SessionRecord> for HistorySummary {
    fn from(record: &SessionRecord) -> Self {
        let session = &record.session;
        let archived_at = record.archived_at.unwrap_or(session.updated_at);
        Self {
            session_id: session.session_id.clone(),
            scene_id: session.scene_id.clone(),
            status: session.status,
            outcome: session.outcome,
            round_number: session.round_number,
            combatant_count: session.combatants.len(),
            archived_at,
            duration_seconds: record
                .duration_seconds
                .unwrap_or_else(|| (archived_at - session.created_at).num_seconds().max(0)),
        }
    }
}
