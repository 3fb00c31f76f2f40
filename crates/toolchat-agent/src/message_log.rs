//! The conversation log.
//!
//! An ordered, append-only list of turns.  The only structural rule is that a
//! system turn may appear once, and only as the very first entry.

use serde::Serialize;

use crate::error::{AgentError, Result};
use crate::llm::types::{Message, Role, ToolCall};

/// Ordered record of conversation turns.  Insertion order is conversation
/// order; turns are never edited, removed, or reordered.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

/// Per-role turn counts.  `total` always equals the sum of the four roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub total: usize,
    pub system: usize,
    pub user: usize,
    pub assistant: usize,
    pub tool: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log whose first turn is the given system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
        }
    }

    /// Append a turn.
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidArgument`] when a system turn is appended to a
    /// non-empty log.
    pub fn append(&mut self, message: Message) -> Result<()> {
        if message.role() == Role::System && !self.messages.is_empty() {
            return Err(AgentError::InvalidArgument {
                reason: format!(
                    "system message must be the first turn, log already has {} turn(s)",
                    self.messages.len()
                ),
            });
        }
        self.messages.push(message);
        Ok(())
    }

    // The role-specific helpers cannot violate the system-turn rule.

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn push_assistant_tool_calls(&mut self, calls: Vec<ToolCall>) {
        self.messages.push(Message::assistant_tool_calls(calls));
    }

    pub fn push_tool_result(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.messages
            .push(Message::tool_result(tool_call_id, content));
    }

    /// All turns, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn count_by_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role() == role).count()
    }

    pub fn role_counts(&self) -> RoleCounts {
        self.messages
            .iter()
            .fold(RoleCounts::default(), |mut counts, m| {
                counts.total += 1;
                match m.role() {
                    Role::System => counts.system += 1,
                    Role::User => counts.user += 1,
                    Role::Assistant => counts.assistant += 1,
                    Role::Tool => counts.tool += 1,
                }
                counts
            })
    }

    /// Turns that carry human-readable text: system, user and assistant turns
    /// with non-blank content.
    pub fn text_turns(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| {
            matches!(m.role(), Role::System | Role::User | Role::Assistant)
                && !m.content().trim().is_empty()
        })
    }

    /// Content lines of [`Self::text_turns`], in turn order then line order,
    /// with whitespace-only lines skipped.
    pub fn non_empty_content_lines(&self) -> impl Iterator<Item = &str> {
        self.text_turns()
            .flat_map(|m| m.content().lines())
            .filter(|line| !line.trim().is_empty())
    }
}
