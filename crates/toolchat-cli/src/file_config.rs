//! Optional TOML configuration.
//!
//! Read from `toolchat.toml` in the working directory, or from the path
//! given with `--config`.  Every field has a default, so an empty file and a
//! missing file behave the same.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use toolchat_agent::config::{DEFAULT_EXIT_KEYWORDS, DEFAULT_MAX_TOOL_ROUNDS};
use toolchat_agent::{DispatchFailurePolicy, ExecutionOptions, SessionConfig};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "toolchat.toml";

// ---------------------------------------------------------------------------
// File layout
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub session: SessionSection,
    pub export: ExportSection,
    pub model: ModelSection,
}

/// The `[session]` table.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    pub system_prompt: Option<String>,
    pub exit_keywords: Vec<String>,
    pub allow_empty_input: bool,
    pub max_tool_rounds: u32,
    pub dispatch_timeout_secs: Option<u64>,
    pub on_dispatch_failure: DispatchFailurePolicy,
    pub stream: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            system_prompt: None,
            exit_keywords: DEFAULT_EXIT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            allow_empty_input: true,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            dispatch_timeout_secs: None,
            on_dispatch_failure: DispatchFailurePolicy::Recover,
            stream: false,
        }
    }
}

/// The `[export]` table.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSection {
    /// Directory `save_conversation` writes into.
    pub directory: PathBuf,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// The `[model]` table.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the configuration file.
///
/// An explicit path must exist.  Without one, a missing
/// [`DEFAULT_CONFIG_FILE`] yields the defaults.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(FileConfig::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;

    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

impl FileConfig {
    /// The in-memory form consumed by the session loop.
    pub fn session_config(&self) -> SessionConfig {
        let session = &self.session;
        SessionConfig {
            system_prompt: session.system_prompt.clone(),
            exit_keywords: session.exit_keywords.clone(),
            allow_empty_input: session.allow_empty_input,
            max_tool_rounds: session.max_tool_rounds,
            dispatch_timeout: session.dispatch_timeout_secs.map(Duration::from_secs),
            on_dispatch_failure: session.on_dispatch_failure,
            execution: ExecutionOptions {
                temperature: self.model.temperature,
                max_tokens: self.model.max_tokens,
                stream: session.stream,
                ..ExecutionOptions::default()
            },
        }
    }
}
