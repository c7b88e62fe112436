//! Common error infrastructure for combat-core.
//!
//! Domain-specific errors (`TurnError`, `SessionError`) live beside the code
//! that raises them; this module holds the shared classification used by the
//! runtime to pick a recovery strategy.

/// Severity level of an error, used for categorization and recovery strategies.
///
/// - **Recoverable**: may succeed on retry
/// - **Validation**: invalid input, rejected with no partial mutation
/// - **Internal**: unexpected state inconsistency
/// - **Fatal**: state is unusable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    Recoverable,
    Validation,
    Internal,
    Fatal,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }

    /// Returns true if this error indicates an internal bug.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal | Self::Fatal)
    }
}

/// Common trait for all combat-core errors.
pub trait CombatError: core::fmt::Display + core::fmt::Debug {
    fn severity(&self) -> ErrorSeverity;

    /// Static identifier for this error variant, stable across releases.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
