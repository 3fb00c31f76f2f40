//! LLM integration layer.
//!
//! - [`types`] -- Core data types (messages, tool calls, streaming events).
//! - [`client`] -- HTTP client for the OpenAI and Anthropic APIs.
//! - [`streaming`] -- SSE stream parser for Anthropic incremental responses.
//! - [`streaming_openai`] -- SSE stream parser for OpenAI incremental responses.

pub mod client;
pub mod streaming;
pub mod streaming_openai;
pub mod types;

pub use client::{
    DEFAULT_ANTHROPIC_MODEL, DEFAULT_OPENAI_MODEL, LlmClient, LlmClientConfig, LlmProvider,
};
pub use types::{ChatRequest, LlmResponse, Message, Role, ToolCall, ToolDefinition, Usage};
