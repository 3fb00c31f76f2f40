//! Adapter error types.
//!
//! Tool handlers build [`AdapterError`] values internally and hand them to the
//! registry as [`AgentError`], so the session sees one error type.

use toolchat_agent::AgentError;

/// Error type for the built-in tools.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed within a tool.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// A tool invocation failed.
    #[error("execution failed for tool `{tool_name}`: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

impl From<AdapterError> for AgentError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::InvalidParams { tool_name, reason } => AgentError::InvalidArgument {
                reason: format!("{tool_name}: {reason}"),
            },
            AdapterError::ExecutionFailed { tool_name, reason } => {
                AgentError::ToolExecutionFailed { tool_name, reason }
            }
            AdapterError::IoError(e) => AgentError::Io(e),
            AdapterError::SerializationError(e) => AgentError::Json(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_into_agent_errors() {
        let err: AgentError = AdapterError::ExecutionFailed {
            tool_name: "clear_display".into(),
            reason: "no terminal".into(),
        }
        .into();
        assert!(matches!(
            err,
            AgentError::ToolExecutionFailed { ref tool_name, .. } if tool_name == "clear_display"
        ));

        let err: AgentError = AdapterError::InvalidParams {
            tool_name: "save_conversation".into(),
            reason: "bad file name".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid argument: save_conversation: bad file name"
        );
    }
}
