//! CLI argument definitions for toolchat.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! wiring the session together.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// toolchat -- chat with an LLM that can call local tools.
#[derive(Parser, Debug)]
#[command(
    name = "toolchat",
    version,
    about = "toolchat -- terminal chat with tool calling",
    long_about = "Starts an interactive chat session.  The model can call built-in tools \
                  to save, count, clear or end the conversation.  Type exit, quit or q to leave."
)]
pub struct Cli {
    /// Path to a TOML configuration file.  Defaults to `toolchat.toml` when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Which tool set the session starts with.
    #[arg(long, value_enum, default_value_t = Profile::Assistant)]
    pub profile: Profile,
}

/// Tool sets a session can be started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Plain chat, no tools.
    Basic,
    /// All built-in tools.
    Assistant,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_starts_assistant_session() {
        let cli = Cli::try_parse_from(["toolchat"]).unwrap();
        assert_eq!(cli.profile, Profile::Assistant);
        assert!(cli.config.is_none());
    }

    #[test]
    fn flags_are_parsed() {
        let cli =
            Cli::try_parse_from(["toolchat", "--profile", "basic", "--config", "chat.toml"])
                .unwrap();
        assert_eq!(cli.profile, Profile::Basic);
        assert_eq!(cli.config, Some(PathBuf::from("chat.toml")));

        assert!(Cli::try_parse_from(["toolchat", "--profile", "admin"]).is_err());
    }
}
