//! Core types for LLM interaction.
//!
//! These types model the data flowing between the session loop and LLM
//! providers.  They are provider-agnostic at this layer; the [`super::client`]
//! module translates them into provider-specific wire formats.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions that shape model behavior.
    System,
    /// Input from the human user.
    User,
    /// Output from the LLM.
    Assistant,
    /// Result of a tool invocation, fed back to the model.
    Tool,
}

impl Role {
    /// All roles, in the order used for summary statistics.
    pub const ALL: [Role; 4] = [Role::System, Role::User, Role::Assistant, Role::Tool];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "System"),
            Self::User => write!(f, "User"),
            Self::Assistant => write!(f, "Assistant"),
            Self::Tool => write!(f, "Tool"),
        }
    }
}

/// A single turn in a conversation.
///
/// Turns are immutable once built: the fields are only readable through
/// accessors, and the log only ever appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,

    /// For [`Role::Tool`] messages this contains the serialized tool result.
    /// For [`Role::Assistant`] messages that contain tool calls only, this
    /// may be empty.
    #[serde(default)]
    content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that contains tool calls.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Who produced this message.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The textual content of the message.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Tool calls requested by the assistant (empty for every other role).
    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    /// Which tool call this message answers (only set for [`Role::Tool`]).
    pub fn tool_call_id(&self) -> Option<&str> {
        self.tool_call_id.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// A tool invocation requested by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier assigned by the LLM for correlating results.
    pub id: String,

    /// The name of the tool to invoke (must match a registered tool).
    pub name: String,

    /// Arguments as a JSON value.  The structure depends on the tool's schema.
    pub arguments: Value,
}

/// A tool definition exposed to the LLM so it knows what tools are available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,

    /// Human-readable description of what the tool does.
    pub description: String,

    /// JSON Schema describing the tool's input parameters.
    pub input_schema: Value,
}

// ---------------------------------------------------------------------------
// LLM response
// ---------------------------------------------------------------------------

/// The high-level response from an LLM after processing a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmResponse {
    /// The model produced a final text answer.
    Text(String),

    /// The model wants to invoke one or more tools before continuing.
    ToolCalls(Vec<ToolCall>),
}

// ---------------------------------------------------------------------------
// Chat request
// ---------------------------------------------------------------------------

/// A full request to send to an LLM provider.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// The model identifier (e.g. `"gpt-4o-mini"`).  Empty means the
    /// client's default model.
    pub model: String,

    /// The conversation history.
    pub messages: Vec<Message>,

    /// Tool definitions the model may invoke.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,

    /// Let the model decide on its own whether to call tools.
    #[serde(skip)]
    pub auto_tool_choice: bool,

    /// Sampling temperature (0.0 = deterministic, 1.0 = creative).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate in this turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether to use streaming SSE mode.
    #[serde(skip)]
    pub stream: bool,
}

// ---------------------------------------------------------------------------
// Streaming events
// ---------------------------------------------------------------------------

/// Events emitted during SSE streaming from the Anthropic Messages API.
///
/// These map to the `event:` field in the SSE stream.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The stream has started; input tokens are known at stream start.
    MessageStart {
        /// The unique message id from the API.
        message_id: String,
        /// The model that is responding.
        model: String,
        /// Number of input (prompt) tokens billed for this request.
        input_tokens: u32,
    },

    /// A new content block has started.  For text blocks, `content_type` will
    /// be `"text"`.  For tool-use blocks it will be `"tool_use"`.
    ContentBlockStart {
        /// Zero-based index of the content block.
        index: u32,
        /// The type of content block (`"text"` or `"tool_use"`).
        content_type: String,
        /// For tool_use blocks: the tool call id.
        id: Option<String>,
        /// For tool_use blocks: the tool name.
        name: Option<String>,
    },

    /// An incremental delta within a content block.
    ContentBlockDelta {
        /// The content block index this delta belongs to.
        index: u32,
        /// The delta variant.
        delta: StreamDelta,
    },

    /// A content block has finished streaming.
    ContentBlockStop {
        /// The content block index that stopped.
        index: u32,
    },

    /// The overall message is complete.
    MessageDelta {
        /// The stop reason (`"end_turn"`, `"tool_use"`, `"max_tokens"`, etc.).
        stop_reason: Option<String>,
        /// Number of output tokens generated in this response.
        output_tokens: u32,
    },

    /// The stream has fully terminated.
    MessageStop,

    /// A ping / keepalive event (no payload).
    Ping,
}

/// Incremental delta within a streaming content block.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A chunk of text.
    TextDelta(String),

    /// A chunk of JSON for a tool-use input.
    InputJsonDelta(String),
}

// ---------------------------------------------------------------------------
// Usage tracking
// ---------------------------------------------------------------------------

/// Token usage information returned by the LLM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the input (prompt).
    pub input_tokens: u32,
    /// Number of tokens generated by the model.
    pub output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_display_is_capitalised() {
        assert_eq!(Role::System.to_string(), "System");
        assert_eq!(Role::User.to_string(), "User");
        assert_eq!(Role::Assistant.to_string(), "Assistant");
        assert_eq!(Role::Tool.to_string(), "Tool");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn tool_result_carries_call_id() {
        let msg = Message::tool_result("call_1", "{\"total\":3}");
        assert_eq!(msg.role(), Role::Tool);
        assert_eq!(msg.tool_call_id(), Some("call_1"));
        assert!(msg.tool_calls().is_empty());
    }

    #[test]
    fn message_serialization_skips_empty_fields() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }
}
