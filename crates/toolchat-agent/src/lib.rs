//! Conversation runtime for toolchat.
//!
//! This crate holds everything a chat session needs apart from the concrete
//! tools and the terminal: the message log, the tool registry, the session
//! loop, and an LLM client that speaks the OpenAI and Anthropic APIs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   line   ┌─────────┐  messages + tools  ┌───────────────────┐
//! │ Console  │────────> │ Session │──────────────────> │ CompletionService │
//! └──────────┘ <────────└────┬────┘ <──────────────────│   (LlmClient)     │
//!                 reply      │       text / tool calls └───────────────────┘
//!                      ┌─────┴──────┐
//!                      │ MessageLog │  ToolRegistry
//!                      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`message_log`] -- Append-only conversation record.
//! - [`registry`] -- Tool descriptors, argument validation and invocation.
//! - [`runtime`] -- The session loop and the completion service trait.
//! - [`console`] -- Line-based console trait.
//! - [`config`] -- Session configuration.
//! - [`llm`] -- LLM client, streaming, and wire types.
//! - [`error`] -- Agent error types.

pub mod config;
pub mod console;
pub mod error;
pub mod llm;
pub mod message_log;
pub mod registry;
pub mod runtime;

pub use config::{DispatchFailurePolicy, ExecutionOptions, SessionConfig};
pub use console::Console;
pub use error::{AgentError, Result};
pub use llm::{
    LlmClient, LlmClientConfig, LlmProvider, LlmResponse, Message, Role, ToolCall, ToolDefinition,
};
pub use message_log::{MessageLog, RoleCounts};
pub use registry::{
    ParamKind, ToolContext, ToolDescriptor, ToolHandler, ToolOutcome, ToolParameter, ToolRegistry,
};
pub use runtime::{CompletionService, Session, SessionEnd, SessionState, TurnOutcome};
