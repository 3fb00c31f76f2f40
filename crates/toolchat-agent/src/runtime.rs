//! The session loop.
//!
//! A [`Session`] owns one [`MessageLog`] and one [`ToolRegistry`] and drives
//! the read, append, dispatch, respond cycle.  When the model asks for tools
//! the session runs them in request order, appends one tool turn per call and
//! dispatches again, until the model answers with text.
//!
//! ```text
//! AwaitingInput ──> Dispatching ──> Responding ──> AwaitingInput
//!                     │    ^
//!                     v    │
//!               AwaitingToolResult
//! ```
//!
//! Any state can move to `Terminated` through an exit keyword, the exit tool,
//! end of input, or a dispatch failure under [`DispatchFailurePolicy::Terminate`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::config::{DispatchFailurePolicy, ExecutionOptions, SessionConfig};
use crate::console::Console;
use crate::error::{AgentError, Result};
use crate::llm::types::{LlmResponse, Message, ToolCall, ToolDefinition};
use crate::message_log::MessageLog;
use crate::registry::{ToolContext, ToolOutcome, ToolRegistry};

/// Input prompt shown before every read.
pub const INPUT_PROMPT: &str = "You > ";

/// Prefix for printed assistant replies.
pub const REPLY_PREFIX: &str = "AI > ";

/// Printed on every normal termination.
pub const FAREWELL: &str = "Goodbye!";

// ---------------------------------------------------------------------------
// Completion collaborator
// ---------------------------------------------------------------------------

/// Produces the next assistant move for a conversation.
///
/// The service decides on its own which tools to call and with what
/// arguments; the session only executes what it asks for.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &ExecutionOptions,
    ) -> Result<LlmResponse>;
}

// ---------------------------------------------------------------------------
// Session types
// ---------------------------------------------------------------------------

/// Where the session currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingInput,
    Dispatching,
    AwaitingToolResult,
    Responding,
    Terminated,
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed an exit keyword.
    ExitKeyword,
    /// The exit tool was called with confirmation.
    ExitTool,
    /// The console reached end of input.
    EndOfInput,
    /// A dispatch failed and the policy is to terminate.
    DispatchAborted { reason: String },
}

impl SessionEnd {
    /// Process exit code for this ending.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ExitKeyword | Self::ExitTool | Self::EndOfInput => 0,
            Self::DispatchAborted { .. } => 1,
        }
    }
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitKeyword => write!(f, "exit keyword"),
            Self::ExitTool => write!(f, "exit tool"),
            Self::EndOfInput => write!(f, "end of input"),
            Self::DispatchAborted { reason } => write!(f, "dispatch aborted: {reason}"),
        }
    }
}

/// Result of handling one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The assistant replied; the text was appended and printed.
    Replied(String),
    /// Blank input while empty input is disallowed.  Nothing happened.
    Skipped,
    /// The dispatch failed, was reported, and the session carries on.
    Recovered { reason: String },
    /// The session is over.
    Finished(SessionEnd),
}

/// How one dispatch ended, before the turn is closed.
enum DispatchResult {
    Reply(String),
    Terminate,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One conversation from start to termination.
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    registry: ToolRegistry,
    tool_definitions: Vec<ToolDefinition>,
    completion: Arc<dyn CompletionService>,
    log: MessageLog,
    state: SessionState,
}

impl Session {
    /// Create a session.  The log is seeded with the configured system prompt.
    ///
    /// # Errors
    ///
    /// [`AgentError::ConfigError`] if the configuration is invalid.
    pub fn new(
        config: SessionConfig,
        registry: ToolRegistry,
        completion: Arc<dyn CompletionService>,
    ) -> Result<Self> {
        config.validate()?;

        let log = match &config.system_prompt {
            Some(prompt) => MessageLog::with_system_prompt(prompt.clone()),
            None => MessageLog::new(),
        };

        Ok(Self {
            id: Uuid::now_v7(),
            tool_definitions: registry.definitions(),
            config,
            registry,
            completion,
            log,
            state: SessionState::AwaitingInput,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Read and handle lines until the session terminates.
    pub async fn run(&mut self, console: &mut dyn Console) -> Result<SessionEnd> {
        tracing::info!(
            session_id = %self.id,
            tools = self.registry.len(),
            "session started"
        );

        let end = loop {
            self.state = SessionState::AwaitingInput;
            let Some(line) = console.read_line(INPUT_PROMPT)? else {
                self.state = SessionState::Terminated;
                break SessionEnd::EndOfInput;
            };

            if let TurnOutcome::Finished(end) = self.handle_line(&line, console).await? {
                break end;
            }
        };

        if end.exit_code() == 0 {
            console.write_line(FAREWELL)?;
        }

        tracing::info!(
            session_id = %self.id,
            turns = self.log.len(),
            reason = %end,
            "session ended"
        );
        Ok(end)
    }

    /// Handle one line of user input.
    ///
    /// # Errors
    ///
    /// Console I/O errors, or [`AgentError::InvalidArgument`] if the session
    /// has already terminated.  Dispatch failures are reported on the console
    /// and returned as [`TurnOutcome::Recovered`] or
    /// [`SessionEnd::DispatchAborted`] according to the failure policy.
    pub async fn handle_line(
        &mut self,
        line: &str,
        console: &mut dyn Console,
    ) -> Result<TurnOutcome> {
        if self.state == SessionState::Terminated {
            return Err(AgentError::InvalidArgument {
                reason: "session has already terminated".into(),
            });
        }

        if self.config.is_exit_keyword(line) {
            tracing::debug!(session_id = %self.id, "exit keyword received");
            self.state = SessionState::Terminated;
            return Ok(TurnOutcome::Finished(SessionEnd::ExitKeyword));
        }

        if line.trim().is_empty() && !self.config.allow_empty_input {
            return Ok(TurnOutcome::Skipped);
        }

        self.log.push_user(line);
        self.state = SessionState::Dispatching;

        match self.dispatch(console).await {
            Ok(DispatchResult::Reply(text)) => {
                self.state = SessionState::Responding;
                self.log.push_assistant(text.clone());
                console.write_line(&format!("{REPLY_PREFIX}{text}"))?;
                self.state = SessionState::AwaitingInput;
                Ok(TurnOutcome::Replied(text))
            }
            Ok(DispatchResult::Terminate) => {
                self.state = SessionState::Terminated;
                Ok(TurnOutcome::Finished(SessionEnd::ExitTool))
            }
            Err(e) if e.is_dispatch_failure() => {
                let reason = e.to_string();
                tracing::warn!(session_id = %self.id, error = %reason, "dispatch failed");
                console.write_line(&format!("Error: {reason}"))?;

                match self.config.on_dispatch_failure {
                    DispatchFailurePolicy::Recover => {
                        self.state = SessionState::AwaitingInput;
                        Ok(TurnOutcome::Recovered { reason })
                    }
                    DispatchFailurePolicy::Terminate => {
                        self.state = SessionState::Terminated;
                        Ok(TurnOutcome::Finished(SessionEnd::DispatchAborted { reason }))
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Dispatch until the model answers with text or a tool ends the session.
    async fn dispatch(&mut self, console: &mut dyn Console) -> Result<DispatchResult> {
        let max_rounds = self.config.max_tool_rounds;
        let mut rounds = 0;

        loop {
            self.state = SessionState::Dispatching;
            let calls = match self.request().await? {
                LlmResponse::Text(text) => return Ok(DispatchResult::Reply(text)),
                LlmResponse::ToolCalls(calls) if calls.is_empty() => {
                    return Ok(DispatchResult::Reply(String::new()));
                }
                LlmResponse::ToolCalls(calls) => calls,
            };

            if rounds == max_rounds {
                return Err(AgentError::MaxToolRoundsExceeded { max_rounds });
            }
            rounds += 1;

            tracing::debug!(
                session_id = %self.id,
                round = rounds,
                tools = ?calls.iter().map(|c| &c.name).collect::<Vec<_>>(),
                "model requested tools"
            );

            self.log.push_assistant_tool_calls(calls.clone());
            self.state = SessionState::AwaitingToolResult;

            for call in &calls {
                if self.run_tool(call, console).await? {
                    return Ok(DispatchResult::Terminate);
                }
            }
        }
    }

    /// One completion request, bounded by the dispatch timeout if set.
    ///
    /// Whatever the completion service returns as an error is a dispatch
    /// failure, whichever variant it arrives as.
    async fn request(&self) -> Result<LlmResponse> {
        let pending = self.completion.complete(
            self.log.messages(),
            &self.tool_definitions,
            &self.config.execution,
        );

        let result = match self.config.dispatch_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| AgentError::DispatchTimeout { limit })?,
            None => pending.await,
        };

        result.map_err(|e| {
            if e.is_dispatch_failure() {
                e
            } else {
                AgentError::LlmRequestFailed {
                    reason: e.to_string(),
                }
            }
        })
    }

    /// Run one tool call and append its result.  Returns `true` when the tool
    /// asked the session to terminate.
    async fn run_tool(&mut self, call: &ToolCall, console: &mut dyn Console) -> Result<bool> {
        let outcome = self
            .registry
            .invoke(
                &call.name,
                &call.arguments,
                ToolContext {
                    log: &self.log,
                    console: &mut *console,
                },
            )
            .await;

        let content = match outcome {
            Ok(ToolOutcome::Terminate) => {
                tracing::info!(session_id = %self.id, tool = %call.name, "tool requested termination");
                return Ok(true);
            }
            Ok(ToolOutcome::Completed(Value::String(text))) => text,
            Ok(ToolOutcome::Completed(value)) => value.to_string(),
            Err(e) => {
                tracing::warn!(session_id = %self.id, tool = %call.name, error = %e, "tool call failed");
                format!("Error: {e}")
            }
        };

        self.log.push_tool_result(call.id.clone(), content);
        Ok(false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("turns", &self.log.len())
            .field("tools", &self.registry.names())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
