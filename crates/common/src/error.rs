//! Error types for canteen-rs.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
///
/// Follows the failure taxonomy of the voting client: validation errors are
/// detected client-side before any request is made, conflict and cooldown
/// errors echo server-enforced business rules, transport errors are terminal
/// for the attempt and never retried automatically.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client-detected (pre-flight) ===
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Another request for this action is still in flight")]
    Busy,

    // === Server-detected business rules ===
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Wish cooldown active: {remaining_seconds}s remaining")]
    CooldownActive {
        /// Seconds until the next wish reassignment is accepted.
        remaining_seconds: u64,
    },

    // === Authorization ===
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // === Absence (legal empty state, not a failure) ===
    #[error("Not found: {0}")]
    NotFound(String),

    // === Transport / server ===
    #[error("Network error: {0}")]
    Transport(String),

    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Server-provided message, when one was present.
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Returns whether the caller may safely retry the failed attempt by an
    /// explicit user action. Mutating calls are never retried automatically.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns whether this error should be rendered as an empty state
    /// rather than a failure message.
    #[must_use]
    pub const fn is_empty_state(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Api {
            status: 500,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(AppError::Transport("timeout".to_string()).is_retryable());
        assert!(!AppError::Busy.is_retryable());
        assert!(!AppError::CooldownActive { remaining_seconds: 10 }.is_retryable());
        assert!(!AppError::Conflict("duplicate dish name".to_string()).is_retryable());
    }

    #[test]
    fn test_not_found_is_empty_state() {
        assert!(AppError::NotFound("no poll today".to_string()).is_empty_state());
        assert!(!AppError::Unauthenticated.is_empty_state());
    }
}
