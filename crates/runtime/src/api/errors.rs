//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from session validation, repositories and turn providers so
//! clients can bubble them up with consistent context.

use combat_core::{CombatError, CombatantId, ErrorSeverity, SessionError};
use thiserror::Error;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("combat session {session_id} already exists in campaign {campaign_id}")]
    DuplicateSession {
        campaign_id: String,
        session_id: String,
    },

    #[error("no combat session {session_id} in campaign {campaign_id}")]
    SessionNotFound {
        campaign_id: String,
        session_id: String,
    },

    #[error("submitted actor {provided} does not match current actor {expected}")]
    InvalidActor {
        expected: CombatantId,
        provided: CombatantId,
    },

    #[error("turn provider has no submission for {actor}")]
    ProviderExhausted { actor: CombatantId },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}

impl CombatError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            RuntimeError::DuplicateSession { .. }
            | RuntimeError::SessionNotFound { .. }
            | RuntimeError::InvalidActor { .. }
            | RuntimeError::ProviderExhausted { .. } => ErrorSeverity::Validation,
            RuntimeError::Session(inner) => inner.severity(),
            RuntimeError::Repository(inner) => inner.severity(),
            RuntimeError::Config(_) | RuntimeError::Logging(_) => ErrorSeverity::Fatal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateSession { .. } => "RUNTIME_DUPLICATE_SESSION",
            RuntimeError::SessionNotFound { .. } => "RUNTIME_SESSION_NOT_FOUND",
            RuntimeError::InvalidActor { .. } => "RUNTIME_INVALID_ACTOR",
            RuntimeError::ProviderExhausted { .. } => "RUNTIME_PROVIDER_EXHAUSTED",
            RuntimeError::Session(inner) => inner.error_code(),
            RuntimeError::Repository(inner) => inner.error_code(),
            RuntimeError::Config(_) => "RUNTIME_CONFIG",
            RuntimeError::Logging(_) => "RUNTIME_LOGGING",
        }
    }
}
