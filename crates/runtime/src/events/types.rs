//! Events emitted by the combat runtime.

use combat_core::{
    CampaignId, CombatOutcome, CombatantId, SessionId, SessionStatus, TerminationReason,
};
use serde::{Deserialize, Serialize};

use super::Topic;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CombatEvent {
    CombatStarted {
        campaign_id: CampaignId,
        session_id: SessionId,
        scene_id: String,
        turn_order: Vec<CombatantId>,
        first_actor: Option<CombatantId>,
    },
    CombatantJoined {
        campaign_id: CampaignId,
        session_id: SessionId,
        combatant_id: CombatantId,
    },
    TurnAdvanced {
        campaign_id: CampaignId,
        session_id: SessionId,
        from: CombatantId,
        to: CombatantId,
        reason: TerminationReason,
        round_number: u32,
    },
    RoundStarted {
        campaign_id: CampaignId,
        session_id: SessionId,
        round_number: u32,
    },
    CombatEnded {
        campaign_id: CampaignId,
        session_id: SessionId,
        status: SessionStatus,
        outcome: Option<CombatOutcome>,
        archived: bool,
    },
    SessionRecovered {
        campaign_id: CampaignId,
        session_id: SessionId,
        round_number: u32,
        current_actor: Option<CombatantId>,
    },
}

impl CombatEvent {
    pub fn topic(&self) -> Topic {
        match self {
            CombatEvent::CombatStarted { .. }
            | CombatEvent::CombatEnded { .. }
            | CombatEvent::SessionRecovered { .. } => Topic::Lifecycle,
            CombatEvent::CombatantJoined { .. }
            | CombatEvent::TurnAdvanced { .. }
            | CombatEvent::RoundStarted { .. } => Topic::Turn,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            CombatEvent::CombatStarted { session_id, .. }
            | CombatEvent::CombatantJoined { session_id, .. }
            | CombatEvent::TurnAdvanced { session_id, .. }
            | CombatEvent::RoundStarted { session_id, .. }
            | CombatEvent::CombatEnded { session_id, .. }
            | CombatEvent::SessionRecovered { session_id, .. } => session_id,
        }
    }
}
