//! Conversation tools -- save, count turns, count lines.
//!
//! - `save_conversation` -- export the log through [`ConversationExporter`].
//! - `count_messages` -- total and per-role turn counts.
//! - `count_lines` -- print the readable transcript and count its lines.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::debug;

use toolchat_agent::{
    ParamKind, ToolContext, ToolDescriptor, ToolHandler, ToolOutcome, ToolParameter,
};

use crate::error::AdapterError;
use crate::export::ConversationExporter;
use crate::params::optional_str;

// ---------------------------------------------------------------------------
// save_conversation
// ---------------------------------------------------------------------------

struct SaveConversation {
    exporter: ConversationExporter,
}

#[async_trait]
impl ToolHandler for SaveConversation {
    async fn call(
        &self,
        ctx: ToolContext<'_>,
        args: &Map<String, Value>,
    ) -> toolchat_agent::Result<ToolOutcome> {
        let destination = match optional_str(args, "file_name") {
            Some(name) => {
                // Only bare file names; the export directory is fixed.
                if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
                    return Err(AdapterError::InvalidParams {
                        tool_name: "save_conversation".into(),
                        reason: format!("`{name}` is not a plain file name"),
                    }
                    .into());
                }
                Some(self.exporter.directory().join(name))
            }
            None => None,
        };

        let record = self.exporter.export(ctx.log, destination.as_deref());
        debug!(success = record.success, path = %record.file_path.display(), "save_conversation");

        Ok(ToolOutcome::Completed(
            serde_json::to_value(&record).map_err(AdapterError::from)?,
        ))
    }
}

/// Descriptor for `save_conversation`, writing into the exporter's directory.
pub fn save_conversation(exporter: ConversationExporter) -> ToolDescriptor {
    ToolDescriptor::new(
        "save_conversation",
        "Saves the conversation to a file",
        Arc::new(SaveConversation { exporter }),
    )
    .with_param(ToolParameter::optional(
        "file_name",
        ParamKind::String,
        "File name to write; a timestamped name is used when omitted",
    ))
}

// ---------------------------------------------------------------------------
// count_messages
// ---------------------------------------------------------------------------

struct CountMessages;

#[async_trait]
impl ToolHandler for CountMessages {
    async fn call(
        &self,
        ctx: ToolContext<'_>,
        _args: &Map<String, Value>,
    ) -> toolchat_agent::Result<ToolOutcome> {
        let counts = ctx.log.role_counts();
        Ok(ToolOutcome::Completed(json!({
            "total": counts.total,
            "system": counts.system,
            "user": counts.user,
            "assistant": counts.assistant,
            "tool": counts.tool,
        })))
    }
}

pub fn count_messages() -> ToolDescriptor {
    ToolDescriptor::new(
        "count_messages",
        "Counts the messages in the conversation, in total and per role",
        Arc::new(CountMessages),
    )
}

// ---------------------------------------------------------------------------
// count_lines
// ---------------------------------------------------------------------------

struct CountLines;

#[async_trait]
impl ToolHandler for CountLines {
    async fn call(
        &self,
        ctx: ToolContext<'_>,
        _args: &Map<String, Value>,
    ) -> toolchat_agent::Result<ToolOutcome> {
        let message_count = ctx.log.text_turns().count();
        let lines = ctx.log.non_empty_content_lines().count();

        let block = ctx
            .log
            .text_turns()
            .map(|m| m.content())
            .collect::<Vec<_>>()
            .join("\n");
        ctx.console.write_line(&block).map_err(AdapterError::from)?;
        ctx.console
            .write_line(&format!("result: messages: {message_count}, lines: {lines}"))
            .map_err(AdapterError::from)?;

        Ok(ToolOutcome::Completed(json!({
            "message_count": message_count,
            "lines": lines,
        })))
    }
}

pub fn count_lines() -> ToolDescriptor {
    ToolDescriptor::new(
        "count_lines",
        "Counts the lines in the conversation",
        Arc::new(CountLines),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
