//! SSE stream parser for the OpenAI Chat Completions API.
//!
//! OpenAI sends bare `data:` lines whose JSON payload carries a
//! `choices[0].delta` object, and ends the stream with `data: [DONE]`.

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::llm::types::{LlmResponse, ToolCall, Usage};

/// How far past the last known slot a tool call `index` may jump.
const MAX_TOOL_CALL_INDEX_GAP: usize = 64;

/// Accumulates fragments from an OpenAI SSE stream into a complete response.
///
/// Tool call deltas are correlated by their `index`: the id and function name
/// usually arrive in the first chunk, argument fragments in later ones.
#[derive(Debug, Default)]
pub struct OpenAiStreamAccumulator {
    text: String,
    tool_calls: Vec<ToolCallFragments>,
    done: bool,
    usage: Usage,
}

#[derive(Debug, Default)]
struct ToolCallFragments {
    id: String,
    name: String,
    arguments: String,
}

impl OpenAiStreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been received.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Token usage reported so far.  Only populated when the request asked
    /// for `stream_options.include_usage`.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Feed a single SSE line.
    ///
    /// Returns the text delta carried by the line, if any.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<String>> {
        let Some(data) = line.trim_end().strip_prefix("data: ") else {
            return Ok(None);
        };
        let data = data.trim();

        if data == "[DONE]" {
            self.done = true;
            return Ok(None);
        }

        let v: Value = serde_json::from_str(data).map_err(|e| AgentError::LlmParseFailed {
            reason: format!("invalid JSON in OpenAI SSE data: {e}"),
        })?;

        if let Some(usage) = v.get("usage").filter(|u| !u.is_null()) {
            self.usage = Usage {
                input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
            };
        }

        let delta = &v["choices"][0]["delta"];
        if delta.is_null() {
            return Ok(None);
        }

        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                self.merge_tool_call(call)?;
            }
        }

        Ok(delta["content"].as_str().map(|content| {
            self.text.push_str(content);
            content.to_owned()
        }))
    }

    fn merge_tool_call(&mut self, call: &Value) -> Result<()> {
        let raw_index = call["index"].as_u64().unwrap_or(0);
        let index = usize::try_from(raw_index)
            .ok()
            .filter(|&i| i <= self.tool_calls.len() + MAX_TOOL_CALL_INDEX_GAP)
            .ok_or_else(|| AgentError::LlmParseFailed {
                reason: format!("tool call index {raw_index} out of range in OpenAI SSE data"),
            })?;
        if self.tool_calls.len() <= index {
            self.tool_calls
                .resize_with(index + 1, ToolCallFragments::default);
        }

        let slot = &mut self.tool_calls[index];
        if let Some(id) = call["id"].as_str() {
            slot.id = id.to_owned();
        }
        let function = &call["function"];
        if let Some(name) = function["name"].as_str() {
            slot.name.push_str(name);
        }
        if let Some(args) = function["arguments"].as_str() {
            slot.arguments.push_str(args);
        }
        Ok(())
    }

    /// Consume the accumulator and produce the final [`LlmResponse`].
    ///
    /// Tool calls take priority over text, matching the non-streaming path.
    pub fn into_response(self) -> Result<LlmResponse> {
        tracing::debug!(done = self.done, "openai stream finished");

        if self.tool_calls.is_empty() {
            return Ok(LlmResponse::Text(self.text));
        }

        let calls = self
            .tool_calls
            .into_iter()
            .map(|fragments| {
                let arguments = if fragments.arguments.is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&fragments.arguments).map_err(|e| {
                        AgentError::LlmParseFailed {
                            reason: format!(
                                "invalid JSON in OpenAI tool call `{}` arguments: {e}",
                                fragments.name
                            ),
                        }
                    })?
                };
                Ok(ToolCall {
                    id: fragments.id,
                    name: fragments.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LlmResponse::ToolCalls(calls))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
