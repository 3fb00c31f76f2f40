//! SSE stream parsing for the Anthropic Messages API.
//!
//! Anthropic sends an `event:` line followed by a `data:` line per event.
//! [`SseParser`] turns those line pairs into [`StreamEvent`] values and
//! [`AnthropicStreamAccumulator`] folds the events into one [`LlmResponse`].

use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::llm::types::{LlmResponse, StreamDelta, StreamEvent, ToolCall, Usage};

/// Parses raw SSE lines from the Anthropic Messages API stream.
#[derive(Debug, Default)]
pub struct SseParser {
    /// The most recently seen `event:` type, waiting for its `data:` line.
    pending_event: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a single line from the SSE stream.
    ///
    /// Returns `Some(event)` once a `data:` line completes an event; `None`
    /// for comments, blank lines, and `event:` lines.
    pub fn parse_line(&mut self, line: &str) -> Result<Option<StreamEvent>> {
        let line = line.trim_end();

        if line.is_empty() || line.starts_with(':') {
            return Ok(None);
        }

        if let Some(event_type) = line.strip_prefix("event: ") {
            self.pending_event = Some(event_type.to_owned());
            return Ok(None);
        }

        if let Some(data) = line.strip_prefix("data: ") {
            let event_type = self.pending_event.take().unwrap_or_default();
            return decode_event(&event_type, data);
        }

        tracing::trace!(line, "ignoring unrecognised SSE line");
        Ok(None)
    }
}

/// Decode one `(event_type, data)` pair.
fn decode_event(event_type: &str, data: &str) -> Result<Option<StreamEvent>> {
    let event = match event_type {
        "message_start" => {
            let v = parse_json(data)?;
            let message = &v["message"];
            StreamEvent::MessageStart {
                message_id: json_string(message, "id"),
                model: json_string(message, "model"),
                input_tokens: json_u32(&message["usage"], "input_tokens"),
            }
        }

        "content_block_start" => {
            let v = parse_json(data)?;
            let block = &v["content_block"];
            StreamEvent::ContentBlockStart {
                index: json_u32(&v, "index"),
                content_type: json_string(block, "type"),
                id: block["id"].as_str().map(String::from),
                name: block["name"].as_str().map(String::from),
            }
        }

        "content_block_delta" => {
            let v = parse_json(data)?;
            let delta = &v["delta"];
            let delta = match delta["type"].as_str().unwrap_or_default() {
                "text_delta" => StreamDelta::TextDelta(json_string(delta, "text")),
                "input_json_delta" => {
                    StreamDelta::InputJsonDelta(json_string(delta, "partial_json"))
                }
                other => {
                    tracing::warn!(delta_type = other, "unknown delta type");
                    return Ok(None);
                }
            };
            StreamEvent::ContentBlockDelta {
                index: json_u32(&v, "index"),
                delta,
            }
        }

        "content_block_stop" => {
            let v = parse_json(data)?;
            StreamEvent::ContentBlockStop {
                index: json_u32(&v, "index"),
            }
        }

        "message_delta" => {
            let v = parse_json(data)?;
            StreamEvent::MessageDelta {
                stop_reason: v["delta"]["stop_reason"].as_str().map(String::from),
                output_tokens: json_u32(&v["usage"], "output_tokens"),
            }
        }

        "message_stop" => StreamEvent::MessageStop,
        "ping" => StreamEvent::Ping,

        _ if data.trim() == "[DONE]" => StreamEvent::MessageStop,
        _ => {
            tracing::trace!(event_type, "ignoring unknown SSE event type");
            return Ok(None);
        }
    };

    Ok(Some(event))
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Folds Anthropic stream events into a complete response.
#[derive(Debug, Default)]
pub struct AnthropicStreamAccumulator {
    text: String,
    tool_calls: Vec<PendingToolCall>,
    stop_reason: Option<String>,
    usage: Usage,
}

/// A `tool_use` block whose JSON input is still arriving.
#[derive(Debug)]
struct PendingToolCall {
    id: String,
    name: String,
    input_json: String,
}

impl AnthropicStreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.  Text deltas are forwarded to `on_text`.
    pub fn apply<F>(&mut self, event: &StreamEvent, on_text: &mut F)
    where
        F: FnMut(&str),
    {
        match event {
            StreamEvent::MessageStart { input_tokens, .. } => {
                self.usage.input_tokens = *input_tokens;
            }

            StreamEvent::ContentBlockStart {
                content_type,
                id,
                name,
                ..
            } if content_type == "tool_use" => {
                self.tool_calls.push(PendingToolCall {
                    id: id.clone().unwrap_or_default(),
                    name: name.clone().unwrap_or_default(),
                    input_json: String::new(),
                });
            }

            StreamEvent::ContentBlockDelta { delta, .. } => match delta {
                StreamDelta::TextDelta(t) => {
                    self.text.push_str(t);
                    on_text(t);
                }
                StreamDelta::InputJsonDelta(j) => {
                    if let Some(pending) = self.tool_calls.last_mut() {
                        pending.input_json.push_str(j);
                    }
                }
            },

            StreamEvent::MessageDelta {
                stop_reason,
                output_tokens,
            } => {
                self.stop_reason = stop_reason.clone();
                self.usage.output_tokens = *output_tokens;
            }

            _ => {}
        }
    }

    /// Token usage seen so far.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// Convert the accumulated state into a final [`LlmResponse`].
    ///
    /// Tool calls win over text, matching the non-streaming parser.
    pub fn into_response(self) -> Result<LlmResponse> {
        tracing::debug!(stop_reason = ?self.stop_reason, "anthropic stream finished");

        if self.tool_calls.is_empty() {
            return Ok(LlmResponse::Text(self.text));
        }

        let calls = self
            .tool_calls
            .into_iter()
            .map(|pending| {
                let arguments = if pending.input_json.is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&pending.input_json).map_err(|e| {
                        AgentError::LlmParseFailed {
                            reason: format!(
                                "invalid JSON in tool call `{}` input: {e}",
                                pending.name
                            ),
                        }
                    })?
                };
                Ok(ToolCall {
                    id: pending.id,
                    name: pending.name,
                    arguments,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(LlmResponse::ToolCalls(calls))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_json(data: &str) -> Result<Value> {
    serde_json::from_str(data).map_err(|e| AgentError::LlmParseFailed {
        reason: format!("invalid JSON in SSE data: {e}"),
    })
}

fn json_string(v: &Value, field: &str) -> String {
    v[field].as_str().unwrap_or_default().to_owned()
}

fn json_u32(v: &Value, field: &str) -> u32 {
    v[field].as_u64().unwrap_or(0) as u32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(parser: &mut SseParser, event: &str, data: &str) -> Option<StreamEvent> {
        assert!(parser.parse_line(&format!("event: {event}")).unwrap().is_none());
        parser.parse_line(&format!("data: {data}")).unwrap()
    }

    #[test]
    fn message_start_carries_input_tokens() {
        let mut parser = SseParser::new();
        let event = feed(
            &mut parser,
            "message_start",
            r#"{"type":"message_start","message":{"id":"msg_01","model":"claude-sonnet-4-20250514","usage":{"input_tokens":12,"output_tokens":0}}}"#,
        )
        .unwrap();

        match event {
            StreamEvent::MessageStart {
                message_id,
                model,
                input_tokens,
            } => {
                assert_eq!(message_id, "msg_01");
                assert_eq!(model, "claude-sonnet-4-20250514");
                assert_eq!(input_tokens, 12);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn input_json_delta_is_decoded() {
        let mut parser = SseParser::new();
        let event = feed(
            &mut parser,
            "content_block_delta",
            r#"{"type":"content_block_delta","index":1,"delta":{"type":"input_json_delta","partial_json":"{\"confirm\":"}}"#,
        )
        .unwrap();

        match event {
            StreamEvent::ContentBlockDelta {
                index,
                delta: StreamDelta::InputJsonDelta(j),
            } => {
                assert_eq!(index, 1);
                assert_eq!(j, r#"{"confirm":"#);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn blank_comment_and_ping_lines() {
        let mut parser = SseParser::new();
        assert!(parser.parse_line("").unwrap().is_none());
        assert!(parser.parse_line(": keepalive").unwrap().is_none());
        let event = feed(&mut parser, "ping", "{}").unwrap();
        assert!(matches!(event, StreamEvent::Ping));
    }

    #[test]
    fn accumulator_builds_text_response() {
        let mut parser = SseParser::new();
        let mut acc = AnthropicStreamAccumulator::new();
        let mut seen = String::new();

        for (event, data) in [
            (
                "content_block_delta",
                r#"{"index":0,"delta":{"type":"text_delta","text":"hi "}}"#,
            ),
            (
                "content_block_delta",
                r#"{"index":0,"delta":{"type":"text_delta","text":"there"}}"#,
            ),
            (
                "message_delta",
                r#"{"delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":4}}"#,
            ),
        ] {
            let ev = feed(&mut parser, event, data).unwrap();
            acc.apply(&ev, &mut |t: &str| seen.push_str(t));
        }

        assert_eq!(seen, "hi there");
        assert_eq!(acc.usage().output_tokens, 4);
        assert_eq!(
            acc.into_response().unwrap(),
            LlmResponse::Text("hi there".into())
        );
    }

    #[test]
    fn accumulator_assembles_tool_call_input() {
        let mut parser = SseParser::new();
        let mut acc = AnthropicStreamAccumulator::new();

        for (event, data) in [
            (
                "content_block_start",
                r#"{"index":0,"content_block":{"type":"tool_use","id":"toolu_1","name":"clear_display"}}"#,
            ),
            (
                "content_block_delta",
                r#"{"index":0,"delta":{"type":"input_json_delta","partial_json":"{\"confirm\":"}}"#,
            ),
            (
                "content_block_delta",
                r#"{"index":0,"delta":{"type":"input_json_delta","partial_json":"true}"}}"#,
            ),
        ] {
            let ev = feed(&mut parser, event, data).unwrap();
            acc.apply(&ev, &mut |_: &str| {});
        }

        match acc.into_response().unwrap() {
            LlmResponse::ToolCalls(calls) => {
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].id, "toolu_1");
                assert_eq!(calls[0].name, "clear_display");
                assert_eq!(calls[0].arguments["confirm"], true);
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_without_input_gets_empty_object() {
        let mut acc = AnthropicStreamAccumulator::new();
        acc.apply(
            &StreamEvent::ContentBlockStart {
                index: 0,
                content_type: "tool_use".into(),
                id: Some("toolu_2".into()),
                name: Some("count_messages".into()),
            },
            &mut |_: &str| {},
        );

        match acc.into_response().unwrap() {
            LlmResponse::ToolCalls(calls) => assert!(calls[0].arguments.is_object()),
            other => panic!("expected tool calls, got {other:?}"),
        }
    }
}
