//! Command implementations for xtask
//!
//! Each command is a separate module that implements its own CLI args and execution logic.

mod clean;
mod list_sessions;
mod read_session;
mod tail_logs;

pub use clean::Clean;
pub use list_sessions::ListSessions;
pub use read_session::ReadSession;
pub use tail_logs::TailLogs;
