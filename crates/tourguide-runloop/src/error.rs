//! Error types for the poll loop.

use thiserror::Error;

/// Errors that can occur controlling a [`PollLoop`](crate::PollLoop).
#[derive(Debug, Error)]
pub enum PollError {
    /// Zero interval would spin.
    #[error("Poll interval must be greater than zero")]
    InvalidInterval,

    /// `start`/`resume` called outside a Tokio runtime.
    #[error("No Tokio runtime available to spawn the poll task")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PollError::InvalidInterval.to_string(),
            "Poll interval must be greater than zero"
        );
        assert!(PollError::NoRuntime.to_string().contains("Tokio runtime"));
    }
}
