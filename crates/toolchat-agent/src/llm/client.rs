//! Multi-provider LLM client.
//!
//! Supports the **OpenAI Chat Completions API** (including OpenAI-compatible
//! endpoints such as Ollama or vLLM) and the **Anthropic Messages API**, with
//! both streaming SSE and non-streaming modes.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};

use crate::config::ExecutionOptions;
use crate::error::{AgentError, Result};
use crate::llm::streaming::{AnthropicStreamAccumulator, SseParser};
use crate::llm::streaming_openai::OpenAiStreamAccumulator;
use crate::llm::types::{
    ChatRequest, LlmResponse, Message, Role, StreamEvent, ToolCall, ToolDefinition, Usage,
};
use crate::runtime::CompletionService;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Default model for the OpenAI provider.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default model for the Anthropic provider.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

const DEFAULT_MAX_TOKENS: u32 = 4096;
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Provider / configuration
// ---------------------------------------------------------------------------

/// Identifies which wire protocol the client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    /// OpenAI Chat Completions API (also covers compatible endpoints).
    OpenAI,
    /// Anthropic Messages API.
    Anthropic,
}

impl LlmProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
        }
    }
}

/// Configuration for connecting to a single LLM provider endpoint.
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    /// Base URL for the API, without a trailing slash.
    pub base_url: String,
    pub default_model: String,
    /// Used when a request does not set `max_tokens` itself.
    pub max_tokens: u32,
}

impl LlmClientConfig {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::openai_compatible(api_key, model, OPENAI_BASE_URL)
    }

    /// Any endpoint that speaks the OpenAI Chat Completions protocol.
    pub fn openai_compatible(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            default_model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Anthropic,
            api_key: api_key.into(),
            base_url: ANTHROPIC_BASE_URL.to_owned(),
            default_model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An LLM client for either the OpenAI or the Anthropic API.
///
/// Cheap to clone; the HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct LlmClient {
    config: Arc<LlmClientConfig>,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a new client.  Fails if the API key is empty.
    pub fn new(config: LlmClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AgentError::MissingApiKey {
                provider: config.provider.as_str().into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    pub fn default_model(&self) -> &str {
        &self.config.default_model
    }

    /// Send a chat request and wait for the full response.
    pub async fn chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let (body, url) = self.prepare(request, false);
        let resp = self.send(&url, &body).await?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AgentError::LlmRequestFailed {
                reason: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let v: Value = serde_json::from_str(&text).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON response: {e}"),
        })?;

        let (response, usage) = match self.config.provider {
            LlmProvider::OpenAI => parse_openai_response(&v)?,
            LlmProvider::Anthropic => parse_anthropic_response(&v)?,
        };
        tracing::debug!(
            provider = self.config.provider.as_str(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "llm response received"
        );
        Ok(response)
    }

    /// Send a chat request in streaming SSE mode and return the aggregated
    /// response once the stream ends.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let (body, url) = self.prepare(request, true);
        let resp = self.send(&url, &body).await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AgentError::LlmRequestFailed {
                reason: format!("API returned {status}: {text}"),
            });
        }

        let mut on_text = |delta: &str| tracing::trace!(delta, "text delta");

        let (response, usage) = match self.config.provider {
            LlmProvider::OpenAI => {
                let mut acc = OpenAiStreamAccumulator::new();
                for_each_sse_line(resp.bytes_stream(), |line| {
                    if let Some(delta) = acc.feed_line(line)? {
                        on_text(&delta);
                    }
                    Ok(acc.is_done())
                })
                .await?;
                let usage = acc.usage();
                (acc.into_response()?, usage)
            }
            LlmProvider::Anthropic => {
                let mut parser = SseParser::new();
                let mut acc = AnthropicStreamAccumulator::new();
                for_each_sse_line(resp.bytes_stream(), |line| {
                    let Some(event) = parser.parse_line(line)? else {
                        return Ok(false);
                    };
                    acc.apply(&event, &mut on_text);
                    Ok(matches!(event, StreamEvent::MessageStop))
                })
                .await?;
                let usage = acc.usage();
                (acc.into_response()?, usage)
            }
        };
        tracing::debug!(
            provider = self.config.provider.as_str(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "llm stream received"
        );
        Ok(response)
    }

    /// Build the provider-specific body and endpoint URL.
    fn prepare(&self, request: &ChatRequest, stream: bool) -> (Value, String) {
        match self.config.provider {
            LlmProvider::OpenAI => (
                self.build_openai_request_body(request, stream),
                format!("{}/chat/completions", self.config.base_url),
            ),
            LlmProvider::Anthropic => (
                self.build_anthropic_request_body(request, stream),
                format!("{}/v1/messages", self.config.base_url),
            ),
        }
    }

    fn model_for<'a>(&'a self, request: &'a ChatRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        }
    }

    async fn send(&self, url: &str, body: &Value) -> Result<reqwest::Response> {
        let headers = self.headers()?;

        tracing::debug!(
            url,
            model = %body["model"],
            provider = self.config.provider.as_str(),
            "sending LLM request"
        );

        self.http
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(AgentError::from)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let key = &self.config.api_key;
        let invalid = |e: reqwest::header::InvalidHeaderValue| AgentError::LlmRequestFailed {
            reason: format!("invalid API key header: {e}"),
        };

        match self.config.provider {
            LlmProvider::OpenAI => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?,
                );
            }
            LlmProvider::Anthropic => {
                headers.insert("x-api-key", HeaderValue::from_str(key).map_err(invalid)?);
                headers.insert(
                    "anthropic-version",
                    HeaderValue::from_static(ANTHROPIC_VERSION),
                );
            }
        }

        Ok(headers)
    }

    // -- Request bodies --------------------------------------------------------

    fn build_openai_request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let mut body = json!({
            "model": self.model_for(request),
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": messages_to_openai(&request.messages),
        });

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if !request.tools.is_empty() {
            body["tools"] = tools_to_openai(&request.tools);
            if request.auto_tool_choice {
                body["tool_choice"] = json!("auto");
            }
        }

        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({ "include_usage": true });
        }

        body
    }

    fn build_anthropic_request_body(&self, request: &ChatRequest, stream: bool) -> Value {
        let (system_text, messages) = messages_to_anthropic(&request.messages);

        let mut body = json!({
            "model": self.model_for(request),
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": messages,
        });

        if let Some(system) = system_text {
            body["system"] = json!(system);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        if !request.tools.is_empty() {
            body["tools"] = tools_to_anthropic(&request.tools);
            if request.auto_tool_choice {
                body["tool_choice"] = json!({ "type": "auto" });
            }
        }

        if stream {
            body["stream"] = json!(true);
        }

        body
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ExecutionOptions,
    ) -> Result<LlmResponse> {
        let request = ChatRequest {
            model: String::new(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            auto_tool_choice: options.auto_tool_choice,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: options.stream,
        };

        if request.stream {
            self.stream_chat(&request).await
        } else {
            self.chat(&request).await
        }
    }
}

/// Drive an SSE body line by line.  `on_line` returns `true` to stop early.
///
/// Bytes are buffered until a newline so multi-byte characters split across
/// chunks decode correctly.
async fn for_each_sse_line<S, B, E, F>(byte_stream: S, mut on_line: F) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&str) -> Result<bool>,
{
    let mut byte_stream = pin!(byte_stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(|e| AgentError::LlmStreamError {
            reason: format!("stream read error: {e}"),
        })?;
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=pos).collect();
            let line = std::str::from_utf8(&raw).map_err(|e| AgentError::LlmStreamError {
                reason: format!("invalid UTF-8 in stream: {e}"),
            })?;
            if on_line(line)? {
                return Ok(());
            }
        }
    }

    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer);
        on_line(&line)?;
    }

    Ok(())
}

// ===========================================================================
// OpenAI format conversion
// ===========================================================================

/// Convert messages to the OpenAI Chat Completions wire format.
///
/// System turns stay in the array, tool calls go under `assistant.tool_calls`
/// and tool results use `role: "tool"`.
pub fn messages_to_openai(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| match msg.role() {
            Role::System => json!({ "role": "system", "content": msg.content() }),
            Role::User => json!({ "role": "user", "content": msg.content() }),
            Role::Assistant if msg.tool_calls().is_empty() => {
                json!({ "role": "assistant", "content": msg.content() })
            }
            Role::Assistant => {
                let tool_calls: Vec<Value> = msg
                    .tool_calls()
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments.to_string(),
                            }
                        })
                    })
                    .collect();

                let mut m = json!({ "role": "assistant", "tool_calls": tool_calls });
                if !msg.content().is_empty() {
                    m["content"] = json!(msg.content());
                }
                m
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id(),
                "content": msg.content(),
            }),
        })
        .collect()
}

/// OpenAI wraps each tool in `{"type": "function", "function": {...}}`.
pub fn tools_to_openai(tools: &[ToolDefinition]) -> Value {
    tools
        .iter()
        .map(|t| {
            json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.input_schema,
                }
            })
        })
        .collect()
}

/// Parse a non-streaming OpenAI response.
pub fn parse_openai_response(v: &Value) -> Result<(LlmResponse, Usage)> {
    let message = &v["choices"][0]["message"];
    if message.is_null() {
        return Err(AgentError::LlmParseFailed {
            reason: "missing `choices[0].message` in response".into(),
        });
    }

    let usage = Usage {
        input_tokens: v["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: v["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    };

    if let Some(calls) = message["tool_calls"].as_array()
        && !calls.is_empty()
    {
        let calls = calls
            .iter()
            .map(|tc| {
                let function = &tc["function"];
                let name = function["name"].as_str().unwrap_or_default().to_owned();
                let raw_args = function["arguments"].as_str().unwrap_or("{}");
                let arguments: Value =
                    serde_json::from_str(raw_args).map_err(|e| AgentError::LlmParseFailed {
                        reason: format!("invalid JSON in OpenAI tool call `{name}` arguments: {e}"),
                    })?;
                Ok(ToolCall {
                    id: tc["id"].as_str().unwrap_or_default().to_owned(),
                    name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok((LlmResponse::ToolCalls(calls), usage));
    }

    let content = message["content"].as_str().unwrap_or_default();
    Ok((LlmResponse::Text(content.to_owned()), usage))
}

// ===========================================================================
// Anthropic format conversion
// ===========================================================================

/// Split out system turns (Anthropic takes them as a top-level field) and
/// convert the rest.  Tool results travel as `tool_result` blocks in a user
/// message.
fn messages_to_anthropic(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system: Option<String> = None;
    let mut wire = Vec::with_capacity(messages.len());

    for msg in messages {
        match msg.role() {
            Role::System => match &mut system {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(msg.content());
                }
                None => system = Some(msg.content().to_owned()),
            },
            // The Messages API rejects blank text turns.
            Role::User | Role::Assistant
                if msg.tool_calls().is_empty() && msg.content().trim().is_empty() => {}
            Role::User => wire.push(json!({ "role": "user", "content": msg.content() })),
            Role::Assistant if msg.tool_calls().is_empty() => {
                wire.push(json!({ "role": "assistant", "content": msg.content() }));
            }
            Role::Assistant => {
                let mut content = Vec::new();
                if !msg.content().is_empty() {
                    content.push(json!({ "type": "text", "text": msg.content() }));
                }
                for tc in msg.tool_calls() {
                    content.push(json!({
                        "type": "tool_use",
                        "id": tc.id,
                        "name": tc.name,
                        "input": tc.arguments,
                    }));
                }
                wire.push(json!({ "role": "assistant", "content": content }));
            }
            Role::Tool => wire.push(json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": msg.tool_call_id(),
                    "content": msg.content(),
                }],
            })),
        }
    }

    (system, wire)
}

fn tools_to_anthropic(tools: &[ToolDefinition]) -> Value {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.input_schema,
            })
        })
        .collect()
}

fn parse_anthropic_response(v: &Value) -> Result<(LlmResponse, Usage)> {
    let content = v["content"]
        .as_array()
        .ok_or_else(|| AgentError::LlmParseFailed {
            reason: "missing `content` array in response".into(),
        })?;

    let usage = Usage {
        input_tokens: v["usage"]["input_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: v["usage"]["output_tokens"].as_u64().unwrap_or(0) as u32,
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in content {
        match block["type"].as_str() {
            Some("text") => text.push_str(block["text"].as_str().unwrap_or_default()),
            Some("tool_use") => tool_calls.push(ToolCall {
                id: block["id"].as_str().unwrap_or_default().to_owned(),
                name: block["name"].as_str().unwrap_or_default().to_owned(),
                arguments: block["input"].clone(),
            }),
            _ => {}
        }
    }

    if tool_calls.is_empty() {
        Ok((LlmResponse::Text(text), usage))
    } else {
        Ok((LlmResponse::ToolCalls(tool_calls), usage))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
