//! Session configuration.
//!
//! [`SessionConfig`] is the in-memory form the session loop consumes.  The
//! binary fills it from environment variables and the optional TOML file; the
//! defaults here are what a bare launch gets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Words that end the session when typed on their own.
pub const DEFAULT_EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "q"];

/// Upper bound on tool-call rounds within a single user turn.
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 10;

// ---------------------------------------------------------------------------
// Execution options
// ---------------------------------------------------------------------------

/// Options forwarded to the completion service with every dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    /// Let the model pick tools on its own.  The session always enables this.
    pub auto_tool_choice: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Use SSE streaming for the request.
    pub stream: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            auto_tool_choice: true,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch failure policy
// ---------------------------------------------------------------------------

/// What the session does when a dispatch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchFailurePolicy {
    /// Report the error and wait for the next input.
    #[default]
    Recover,
    /// Report the error and end the session.
    Terminate,
}

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

/// Everything the session loop needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Seeded as the first turn of the log when set.
    pub system_prompt: Option<String>,
    /// Compared case-insensitively against the trimmed input line.
    pub exit_keywords: Vec<String>,
    /// When false, blank input lines are skipped instead of dispatched.
    pub allow_empty_input: bool,
    pub max_tool_rounds: u32,
    /// Per-dispatch timeout.  `None` waits indefinitely.
    pub dispatch_timeout: Option<Duration>,
    pub on_dispatch_failure: DispatchFailurePolicy,
    pub execution: ExecutionOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            exit_keywords: DEFAULT_EXIT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            allow_empty_input: true,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            dispatch_timeout: None,
            on_dispatch_failure: DispatchFailurePolicy::Recover,
            execution: ExecutionOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: DispatchFailurePolicy) -> Self {
        self.on_dispatch_failure = policy;
        self
    }

    /// Whether `line` is one of the configured exit keywords.
    pub fn is_exit_keyword(&self, line: &str) -> bool {
        let line = line.trim();
        self.exit_keywords
            .iter()
            .any(|keyword| keyword.eq_ignore_ascii_case(line))
    }

    /// Check the invariants the session loop relies on.
    pub fn validate(&self) -> Result<()> {
        if self.max_tool_rounds == 0 {
            return Err(AgentError::ConfigError {
                reason: "max_tool_rounds must be at least 1".into(),
            });
        }
        if self.exit_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(AgentError::ConfigError {
                reason: "exit keywords must not be blank".into(),
            });
        }
        if self.dispatch_timeout == Some(Duration::ZERO) {
            return Err(AgentError::ConfigError {
                reason: "dispatch timeout must be greater than zero".into(),
            });
        }
        if let Some(temp) = self.execution.temperature
            && !(0.0..=2.0).contains(&temp)
        {
            return Err(AgentError::ConfigError {
                reason: format!("temperature {temp} is outside 0.0..=2.0"),
            });
        }
        Ok(())
    }
}
