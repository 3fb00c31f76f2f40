//! CLI entry point for toolchat.
//!
//! Launching `toolchat` with no arguments starts an interactive chat session
//! with every built-in tool available.

mod cli;
mod file_config;
mod helpers;
mod repl;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::helpers::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; variables may come from the shell.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing("warn");

    let end = repl::cmd_run(cli).await?;
    std::process::exit(end.exit_code());
}
