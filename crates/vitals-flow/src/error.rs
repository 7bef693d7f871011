//! Error taxonomy for flow runs.
//!
//! State-machine misuse and graph assembly problems get their own variants so
//! callers can react to them; failures coming out of the external pipeline
//! executor or browser driver are carried opaquely and surfaced as-is.

use crate::runner::RunPhase;

/// Errors produced by the flow runner and graph assembler.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// An operation was called from the wrong lifecycle state.
    ///
    /// Always rejected synchronously, before any asynchronous work begins.
    #[error("cannot {operation} while run is {state}")]
    Lifecycle {
        operation: &'static str,
        state: RunPhase,
    },

    /// The assembled graph cannot satisfy the ordering invariant.
    #[error("invalid graph configuration: {0}")]
    Configuration(String),

    /// The interaction window exceeded the enforced bound.
    #[error("interaction window exceeded {limit_ms} ms")]
    InteractionTimeout { limit_ms: u64 },

    /// Pass-through failure from the external pipeline executor.
    #[error("pipeline executor error: {0}")]
    Executor(#[source] anyhow::Error),

    /// Pass-through failure from the browser driver.
    #[error("browser driver error: {0}")]
    Driver(#[source] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for flow operations.
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_error_display() {
        let err = FlowError::Lifecycle {
            operation: "end_navigation",
            state: RunPhase::Idle,
        };
        assert!(err.to_string().contains("end_navigation"));
        assert!(err.to_string().contains("idle"));
    }

    #[test]
    fn test_configuration_error_display() {
        let err = FlowError::Configuration("phase 'default' is missing Trace".to_string());
        assert!(err.to_string().contains("invalid graph configuration"));
        assert!(err.to_string().contains("missing Trace"));
    }

    #[test]
    fn test_interaction_timeout_display() {
        let err = FlowError::InteractionTimeout { limit_ms: 30_000 };
        assert!(err.to_string().contains("30000 ms"));
    }
}
