//! Turn resolution and encounter-ending rules.
//!
//! Everything here is a pure function of session state; callers apply the
//! results through [`crate::state::CombatSession`].
mod turns;
mod victory;

pub use turns::{TerminationReason, TurnError, TurnOrderResolver, TurnTransitionResult};
pub use victory::{CombatOutcome, VictoryCondition};
