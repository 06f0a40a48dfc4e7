//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("No models configured for the agent")]
    NoModels,

    #[error("All models failed to respond")]
    AllModelsFailed,

    #[error("Quorum not reached: best agreement {best} of {total}, {required} required")]
    QuorumNotReached {
        best: usize,
        required: usize,
        total: usize,
    },

    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

impl DomainError {
    /// Whether a fresh round could plausibly succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DomainError::AllModelsFailed | DomainError::QuorumNotReached { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_not_reached_display() {
        let error = DomainError::QuorumNotReached {
            best: 1,
            required: 2,
            total: 3,
        };
        assert_eq!(
            error.to_string(),
            "Quorum not reached: best agreement 1 of 3, 2 required"
        );
    }

    #[test]
    fn test_is_retryable() {
        assert!(DomainError::AllModelsFailed.is_retryable());
        assert!(
            DomainError::QuorumNotReached {
                best: 0,
                required: 1,
                total: 1
            }
            .is_retryable()
        );
        assert!(!DomainError::NoModels.is_retryable());
        assert!(!DomainError::InvalidDecision("x".to_string()).is_retryable());
    }
}
