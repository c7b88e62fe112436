//! Deterministic combat rules and data model.
//!
//! `combat-core` defines the encounter state ([`CombatSession`] and its
//! [`CombatantState`] ledger), the pure [`TurnOrderResolver`] and the
//! [`MechanicsReconciler`]. Nothing here performs I/O; the runtime crate owns
//! persistence, locking and logging. All turn-state mutation flows through
//! [`CombatSession::apply_transition`].
pub mod config;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod state;

pub use config::{CombatConfig, DefaultStatsTable, LevelStats};
pub use engine::{
    CombatOutcome, TerminationReason, TurnError, TurnOrderResolver, TurnTransitionResult,
    VictoryCondition,
};
pub use error::{CombatError, ErrorSeverity};
pub use reconcile::{
    CombatantStatus, MechanicsContext, MechanicsReconciler, NarrativeEffect,
    ReconciliationContext, StatusMap, TurnInfo,
};
pub use state::{
    ActionPoints, ActionType, CampaignId, CombatAction, CombatSession, CombatStats,
    CombatantId, CombatantState, Position, ResourceSnapshot, RosterEntry, SessionError,
    SessionId, SessionStatus, StatusEffect, StatusEffectKind, StatusEffects,
};
