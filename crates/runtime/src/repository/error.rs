//! Error types raised by repository implementations.

use combat_core::{CombatError, ErrorSeverity};
use thiserror::Error;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("session repository lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("corrupted data: {0}")]
    CorruptedData(String),

    #[error("invalid {kind} {value:?}: must be non-empty and contain no path separators")]
    InvalidKey { kind: &'static str, value: String },

    #[error("archived {session_id} but could not remove its active record")]
    ArchiveIncomplete {
        session_id: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

impl CombatError for RepositoryError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            RepositoryError::LockPoisoned => ErrorSeverity::Fatal,
            RepositoryError::Io(_) | RepositoryError::ArchiveIncomplete { .. } => {
                ErrorSeverity::Recoverable
            }
            RepositoryError::Json(_) | RepositoryError::CorruptedData(_) => ErrorSeverity::Internal,
            RepositoryError::InvalidKey { .. } => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RepositoryError::LockPoisoned => "REPOSITORY_LOCK_POISONED",
            RepositoryError::Io(_) => "REPOSITORY_IO",
            RepositoryError::Json(_) => "REPOSITORY_JSON",
            RepositoryError::CorruptedData(_) => "REPOSITORY_CORRUPTED_DATA",
            RepositoryError::InvalidKey { .. } => "REPOSITORY_INVALID_KEY",
            RepositoryError::ArchiveIncomplete { .. } => "REPOSITORY_ARCHIVE_INCOMPLETE",
        }
    }
}

/// Rejects ids that would escape the campaign directory layout.
pub(crate) fn validate_key(kind: &'static str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.chars().any(char::is_control);
    if invalid {
        return Err(RepositoryError::InvalidKey {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}
