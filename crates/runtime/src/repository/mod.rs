//! Repository layer for combat sessions.
//!
//! Sessions are stored per campaign in two tiers: an active area overwritten
//! on every mutation and an append-only history area. Static combat content
//! (stats tables, rules configuration) is loaded by `combat-content`, not here.

mod decode;
mod error;
mod file;
mod memory;
mod record;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileSessionRepository;
pub use memory::InMemorySessionRepo;
pub use record::{HistorySummary, SCHEMA_VERSION, SessionRecord};
pub use traits::SessionRepository;
