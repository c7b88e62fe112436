//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration or infrastructure.

pub mod errors;
pub mod providers;
pub mod types;

pub use errors::{Result, RuntimeError};
pub use providers::{EndTurnProvider, ScriptedTurnProvider, TurnProvider};
pub use types::{CombatEnded, CombatStarted, StartCombat, TurnOutcome, TurnSubmission};
