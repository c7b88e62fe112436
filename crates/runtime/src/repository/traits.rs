//! Repository contract for combat session persistence.

use combat_core::{CampaignId, CombatSession, SessionId};

use super::error::Result;
use super::record::{HistorySummary, SessionRecord};

/// Two-tier session store, partitioned by campaign.
///
/// The active tier holds one overwritable record per live session. The
/// history tier is append-only. After a successful [`archive`](Self::archive)
/// a session exists in history and not in active.
pub trait SessionRepository: Send + Sync {
    /// Upserts the active record. The stored log is trimmed; the caller's
    /// session is not.
    fn save(&self, campaign_id: &str, session: &CombatSession) -> Result<()>;

    /// Most recently saved active session of a campaign.
    fn load_active(&self, campaign_id: &str) -> Result<Option<CombatSession>>;

    /// Active session by id.
    fn load_by_id(&self, campaign_id: &str, session_id: &str) -> Result<Option<CombatSession>>;

    /// History record by id.
    fn load_history(&self, campaign_id: &str, session_id: &str) -> Result<Option<SessionRecord>>;

    /// Moves a session from active to history.
    fn archive(&self, campaign_id: &str, session: &CombatSession) -> Result<HistorySummary>;

    /// Ids of every active session of a campaign.
    fn list_active(&self, campaign_id: &str) -> Result<Vec<SessionId>>;

    /// History summaries, newest first.
    fn list_history(&self, campaign_id: &str) -> Result<Vec<HistorySummary>>;

    /// Removes an active record. Returns whether one existed.
    fn delete_active(&self, campaign_id: &str, session_id: &str) -> Result<bool>;

    /// Every campaign with stored data.
    fn list_campaigns(&self) -> Result<Vec<CampaignId>>;

    /// Whether the id is taken in either tier.
    fn exists(&self, campaign_id: &str, session_id: &str) -> Result<bool> {
        Ok(self.load_by_id(campaign_id, session_id)?.is_some()
            || self.load_history(campaign_id, session_id)?.is_some())
    }

    /// Loads every active session of every campaign.
    ///
    /// Unreadable records are logged and skipped so one bad file cannot
    /// block startup.
    fn recover_all(&self) -> Result<Vec<(CampaignId, CombatSession)>> {
        let mut recovered = Vec::new();

        for campaign_id in self.list_campaigns()? {
            let session_ids = match self.list_active(&campaign_id) {
                Ok(ids) => ids,
                Err(err) => {
                    tracing::error!(
                        "Skipping campaign {} during recovery: {}",
                        campaign_id,
                        err
                    );
                    continue;
                }
            };

            for session_id in session_ids {
                match self.load_by_id(&campaign_id, &session_id) {
                    Ok(Some(session)) => recovered.push((campaign_id.clone(), session)),
                    Ok(None) => {}
                    Err(err) => tracing::error!(
                        "Skipping unreadable session {}/{}: {}",
                        campaign_id,
                        session_id,
                        err
                    ),
                }
            }
        }

        tracing::info!("Recovered {} active combat sessions", recovered.len());
        Ok(recovered)
    }
}
