//! Built-in tools for toolchat and the conversation exporter.
//!
//! Each tool is exposed as a function returning a
//! [`ToolDescriptor`](toolchat_agent::ToolDescriptor);
//! [`builtin_registry`] registers all of them.

pub mod clock;
pub mod conversation;
pub mod display;
pub mod error;
pub mod export;
mod params;

#[cfg(test)]
mod testing;

use std::path::PathBuf;

use toolchat_agent::ToolRegistry;

pub use clock::current_timestamp;
pub use conversation::{count_lines, count_messages, save_conversation};
pub use display::{clear_display, exit_application};
pub use error::{AdapterError, Result};
pub use export::{ConversationExporter, DELIMITER, ExportRecord, render};

/// A registry holding every built-in tool.  Saved conversations go to
/// `export_dir`.
pub fn builtin_registry(export_dir: impl Into<PathBuf>) -> toolchat_agent::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for descriptor in [
        save_conversation(ConversationExporter::new(export_dir)),
        count_messages(),
        count_lines(),
        clear_display(),
        exit_application(),
        current_timestamp(),
    ] {
        registry.register(descriptor)?;
    }
    tracing::debug!(tools = ?registry.names(), "built-in tools registered");
    Ok(registry)
}
