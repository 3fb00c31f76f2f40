//! The interactive session on a real terminal.

use std::io::{self, BufRead as _, Write as _};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use tracing::info;

use toolchat_adapters::builtin_registry;
use toolchat_agent::{Console, LlmClient, Session, SessionEnd, ToolRegistry};

use crate::cli::{Cli, Profile};
use crate::file_config::load_file_config;
use crate::helpers::resolve_llm_config;

// ---------------------------------------------------------------------------
// Terminal console
// ---------------------------------------------------------------------------

/// [`Console`] over the process's stdin and stdout.
pub struct TerminalConsole {
    stdin: io::Stdin,
    stdout: io::Stdout,
    buf: Vec<u8>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
            buf: Vec::new(),
        }
    }
}

impl Default for TerminalConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for TerminalConsole {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.stdout, "{prompt}")?;
        self.stdout.flush()?;

        self.buf.clear();
        if self.stdin.lock().read_until(b'\n', &mut self.buf)? == 0 {
            writeln!(self.stdout)?;
            return Ok(None);
        }
        Ok(Some(decode_line(&self.buf)))
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.stdout, "{line}")
    }

    fn clear(&mut self) -> io::Result<()> {
        execute!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))
    }
}

/// Decode one raw input line, replacing invalid UTF-8.
fn decode_line(raw: &[u8]) -> String {
    strip_newline(&String::from_utf8_lossy(raw)).to_owned()
}

/// Drop the line terminator `read_until` keeps, and nothing else.
fn strip_newline(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .unwrap_or(line)
}

// ---------------------------------------------------------------------------
// Session startup
// ---------------------------------------------------------------------------

/// Configure and run one session.  Returns how it ended.
pub async fn cmd_run(cli: Cli) -> Result<SessionEnd> {
    // 1. Configuration file, then credentials.  Both are fatal before the loop.
    let file_config = load_file_config(cli.config.as_deref())?;
    let session_config = file_config.session_config();

    let llm_config = resolve_llm_config()?;
    let llm = LlmClient::new(llm_config).context("failed to create LLM client")?;
    info!(
        provider = llm.provider().as_str(),
        model = %llm.default_model(),
        "LLM client ready"
    );

    // 2. Tool set for the chosen profile.
    let registry = match cli.profile {
        Profile::Basic => ToolRegistry::new(),
        Profile::Assistant => builtin_registry(&file_config.export.directory)
            .context("failed to register built-in tools")?,
    };
    // 3. Run.
    let mut session = Session::new(session_config, registry, Arc::new(llm))
        .context("invalid session configuration")?;
    info!(
        session_id = %session.id(),
        profile = ?cli.profile,
        tools = ?session.registry().names(),
        max_tool_rounds = session.config().max_tool_rounds,
        "session ready"
    );
    let mut console = TerminalConsole::new();
    let end = session.run(&mut console).await?;

    info!(reason = %end, "shutting down");
    Ok(end)
}
