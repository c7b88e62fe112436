//! Request and response types for [`CombatRuntime`](crate::CombatRuntime).

use combat_core::{
    CombatAction, CombatOutcome, CombatSession, CombatantId, MechanicsContext, RosterEntry,
    SessionId, SessionStatus, StatusMap, TerminationReason, TurnInfo, TurnTransitionResult,
    VictoryCondition,
};
use serde::{Deserialize, Serialize};

use crate::repository::HistorySummary;

/// Request to open a new encounter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCombat {
    /// Generated when absent.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub scene_id: String,
    pub roster: Vec<RosterEntry>,
    #[serde(default)]
    pub victory_condition: VictoryCondition,
}

impl StartCombat {
    pub fn new(scene_id: impl Into<String>, roster: Vec<RosterEntry>) -> Self {
        Self {
            session_id: None,
            scene_id: scene_id.into(),
            roster,
            victory_condition: VictoryCondition::default(),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<SessionId>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_victory_condition(mut self, condition: VictoryCondition) -> Self {
        self.victory_condition = condition;
        self
    }
}

/// One resolved step of the current actor's turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSubmission {
    pub actor: CombatantId,
    #[serde(default)]
    pub action: Option<CombatAction>,
    #[serde(default)]
    pub context: MechanicsContext,
    /// Derived from the actor's remaining AP when absent.
    #[serde(default)]
    pub reason: Option<TerminationReason>,
}

impl TurnSubmission {
    pub fn new(actor: impl Into<CombatantId>) -> Self {
        Self {
            actor: actor.into(),
            action: None,
            context: MechanicsContext::default(),
            reason: None,
        }
    }

    /// Ends the actor's turn without further mechanics.
    pub fn end_turn(actor: impl Into<CombatantId>) -> Self {
        Self::new(actor).with_reason(TerminationReason::ExplicitEnd)
    }

    pub fn with_action(mut self, action: CombatAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_context(mut self, context: MechanicsContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_reason(mut self, reason: TerminationReason) -> Self {
        self.reason = Some(reason);
        self
    }
}

/// Result of [`CombatRuntime::start_combat`](crate::CombatRuntime::start_combat).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatStarted {
    pub session: CombatSession,
    pub turn_info: TurnInfo,
    pub persisted: bool,
}

/// Result of [`CombatRuntime::submit_turn`](crate::CombatRuntime::submit_turn).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session_id: SessionId,
    pub transition: TurnTransitionResult,
    /// Reconciled status of every combatant after the action.
    pub statuses: StatusMap,
    /// Turn info after the transition.
    pub turn_info: TurnInfo,
    pub status: SessionStatus,
    pub outcome: Option<CombatOutcome>,
    pub persisted: bool,
    /// Set when the session finished and moved to history.
    pub archived: Option<HistorySummary>,
}

/// Result of ending or aborting an encounter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEnded {
    pub session: CombatSession,
    pub archived: Option<HistorySummary>,
}
