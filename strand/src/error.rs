//! Error types and handling for the strand library

use thiserror::Error;

/// Result type alias for strand operations
pub type Result<T> = std::result::Result<T, StrandError>;

/// Main error type for the strand library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrandError {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// A barrier was alerted while a thread was waiting on it.
    /// This is a shutdown signal, not a failure.
    #[error("Sequence barrier alerted")]
    Alerted,

    /// A timeout-capable wait strategy gave up before the sequence arrived
    #[error("Operation timed out")]
    Timeout,

    /// A non-blocking claim could not be satisfied without lapping a consumer
    #[error("Insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// Lifecycle misuse, e.g. running an event processor twice
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message describing the state violation
        message: String,
    },
}

impl StrandError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a new lifecycle state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check if this error is the cooperative cancellation signal
    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Alerted)
    }

    /// Check if this error is recoverable by retrying later
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout | Self::InsufficientCapacity)
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::StrandError::config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StrandError::config("test message");
        assert!(matches!(err, StrandError::InvalidConfig { .. }));
        assert!(!err.is_recoverable());
        assert!(!err.is_alert());
    }

    #[test]
    fn test_error_classification() {
        assert!(StrandError::Alerted.is_alert());
        assert!(!StrandError::Alerted.is_recoverable());

        assert!(StrandError::Timeout.is_recoverable());
        assert!(StrandError::InsufficientCapacity.is_recoverable());

        let state_err = StrandError::invalid_state("already running");
        assert!(!state_err.is_recoverable());
        assert_eq!(state_err.to_string(), "Invalid state: already running");
    }

    #[test]
    fn test_error_macros() {
        let err = config_error!("Invalid size: {}", 42);
        assert_eq!(err, StrandError::config("Invalid size: 42"));
    }
}
