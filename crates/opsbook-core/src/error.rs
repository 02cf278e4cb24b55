//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the playbook engine.
///
/// Configuration errors (missing or inactive playbooks, unknown action
/// types) terminate an execution; per-action runtime errors are
/// isolated by the orchestrator and recorded on the execution instead
/// of being raised. Retry exhaustion is a distinct variant so callers
/// can tell "this playbook is broken" from "we gave up after N
/// attempts".
#[derive(Debug, Error)]
pub enum EngineError {
    /// Playbook does not exist for the tenant.
    #[error("Playbook not found: {0}")]
    PlaybookNotFound(String),

    /// Playbook exists but is deactivated.
    #[error("Playbook is inactive: {0}")]
    PlaybookInactive(String),

    /// Target business object does not exist.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// Execution record does not exist.
    #[error("Execution not found: {0}")]
    ExecutionNotFound(String),

    /// Action type is not recognized by the executor.
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    /// Action configuration is incomplete or invalid.
    #[error("Action configuration error: {0}")]
    Configuration(String),

    /// Retry limit reached; the playbook was not executed.
    #[error("Retry limit reached for execution {execution_id} after {attempts} attempts")]
    RetryExhausted { execution_id: String, attempts: u32 },

    /// Object, task, playbook, or execution store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Event sink failure.
    #[error("Event sink error: {0}")]
    EventSink(String),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::PlaybookNotFound("pb-1".to_string());
        assert_eq!(err.to_string(), "Playbook not found: pb-1");

        let err = EngineError::RetryExhausted {
            execution_id: "exec-1".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Retry limit reached for execution exec-1 after 3 attempts"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EngineError = json_err.into();
        assert!(matches!(err, EngineError::Serialization(_)));
    }
}
