//! Topic-based event bus for combat events.
//!
//! Events are published to a topic and consumers subscribe only to the topics
//! they need. Delivery is best-effort: a lagging or absent subscriber never
//! blocks the runtime.

mod bus;
mod types;

pub use bus::{EventBus, Topic};
pub use types::CombatEvent;
