//! Error types for the orchestration layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Orchestrator Error Enum ==
/// Unified error type for cache, deduplication, debounce and prefetch work.
///
/// The type is `Clone` so one settled result can be fanned out to every
/// subscriber of a deduplicated request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The network executor rejected the request
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The operation was aborted through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// An internal cache invariant was violated; the store was reinitialized
    #[error("Cache corruption: {0}")]
    CacheCorruption(String),

    /// A background prefetch job failed
    #[error("Prefetch failure: {0}")]
    PrefetchFailure(String),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorError {
    // == Is Cancelled ==
    /// Returns true when the error means "superseded", not "failed".
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrchestratorError::Cancelled)
    }

    // == Is Retryable ==
    /// Only network failures may be retried; cancellations never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrchestratorError::NetworkFailure(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for the orchestration layer.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_distinguishable() {
        let cancelled = OrchestratorError::Cancelled;
        let failed = OrchestratorError::NetworkFailure("timeout".to_string());

        assert!(cancelled.is_cancelled());
        assert!(!failed.is_cancelled());
        assert_ne!(cancelled, failed);
    }

    #[test]
    fn test_only_network_failures_retry() {
        assert!(OrchestratorError::NetworkFailure("503".to_string()).is_retryable());
        assert!(!OrchestratorError::Cancelled.is_retryable());
        assert!(!OrchestratorError::PrefetchFailure("x".to_string()).is_retryable());
        assert!(!OrchestratorError::CacheCorruption("x".to_string()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = OrchestratorError::NetworkFailure("connection reset".to_string());
        assert_eq!(err.to_string(), "Network failure: connection reset");
        assert_eq!(OrchestratorError::Cancelled.to_string(), "Operation cancelled");
    }
}
