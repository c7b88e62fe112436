//! Mechanics reconciliation.
//!
//! Produces the displayable status of each combatant from the action's
//! [`ReconciliationContext`] and the persisted ledger.
mod context;
mod mechanics;
mod narrative;

pub use context::{MechanicsContext, ReconciliationContext};
pub use mechanics::{CombatantStatus, MechanicsReconciler, StatusMap, TurnInfo};
pub use narrative::NarrativeEffect;
