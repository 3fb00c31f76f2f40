//! Agent error types.
//!
//! All agent subsystems surface errors through [`AgentError`].  Each variant
//! carries enough context for callers to decide how to handle the failure.
//! Dispatch failures (anything the completion service reports) are recoverable
//! per turn; see [`AgentError::is_dispatch_failure`].

/// Unified error type for the conversation runtime.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    // -- Conversation / registry errors -------------------------------------
    /// A caller supplied an argument that violates a contract (bad role
    /// ordering, malformed tool arguments).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// A tool with the same name is already registered.
    #[error("duplicate tool name: {name}")]
    DuplicateTool { name: String },

    /// A tool call referenced a name the registry does not know.
    #[error("unknown tool: {name}")]
    ToolNotFound { name: String },

    /// A tool handler failed.
    #[error("tool execution failed for `{tool_name}`: {reason}")]
    ToolExecutionFailed { tool_name: String, reason: String },

    // -- LLM / dispatch errors ----------------------------------------------
    /// An HTTP request to the LLM provider failed.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The LLM response could not be parsed into the expected format.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The streaming SSE connection was interrupted or produced invalid data.
    #[error("llm stream error: {reason}")]
    LlmStreamError { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// The completion service did not answer within the configured timeout.
    #[error("dispatch timed out after {limit:?}")]
    DispatchTimeout { limit: std::time::Duration },

    /// The model kept requesting tools past the configured round limit.
    #[error("model requested tools for more than {max_rounds} rounds")]
    MaxToolRoundsExceeded { max_rounds: u32 },

    // -- Configuration -------------------------------------------------------
    /// Configuration validation or loading failed.
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    // -- I/O and serialization -----------------------------------------------
    /// Console or filesystem I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether this error originated from the completion service.  Such errors
    /// abort the current turn only.
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            Self::LlmRequestFailed { .. }
                | Self::LlmParseFailed { .. }
                | Self::LlmStreamError { .. }
                | Self::MissingApiKey { .. }
                | Self::DispatchTimeout { .. }
                | Self::MaxToolRoundsExceeded { .. }
        )
    }
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_failures_are_classified() {
        assert!(
            AgentError::DispatchTimeout {
                limit: std::time::Duration::from_secs(5)
            }
            .is_dispatch_failure()
        );
        assert!(
            AgentError::LlmRequestFailed {
                reason: "401".into()
            }
            .is_dispatch_failure()
        );
        assert!(AgentError::MaxToolRoundsExceeded { max_rounds: 3 }.is_dispatch_failure());
        assert!(
            !AgentError::InvalidArgument {
                reason: "bad".into()
            }
            .is_dispatch_failure()
        );
        assert!(
            !AgentError::ToolNotFound {
                name: "nope".into()
            }
            .is_dispatch_failure()
        );
    }

    #[test]
    fn error_display() {
        let err = AgentError::DuplicateTool {
            name: "count_messages".into(),
        };
        assert_eq!(err.to_string(), "duplicate tool name: count_messages");

        let err = AgentError::ToolExecutionFailed {
            tool_name: "clear_display".into(),
            reason: "no tty".into(),
        };
        assert_eq!(
            err.to_string(),
            "tool execution failed for `clear_display`: no tty"
        );
    }
}
