//! Combat data model.
//!
//! [`CombatSession`] owns the ledger of [`CombatantState`]s for one encounter,
//! the fixed initiative order and the action log.
mod action;
mod combatant;
mod common;
mod roster;
mod session;
mod status;

pub use action::{ActionType, CombatAction};
pub use combatant::{ActionPoints, CombatStats, CombatantState};
pub use common::{CampaignId, CombatantId, Position, ResourceSnapshot, SessionId};
pub use roster::RosterEntry;
pub use session::{CombatSession, SessionError, SessionStatus};
pub use status::{StatusEffect, StatusEffectKind, StatusEffects};
