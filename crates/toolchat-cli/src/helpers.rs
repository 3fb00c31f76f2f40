//! Shared startup helpers.
//!
//! Includes tracing initialization, LLM provider resolution, and environment
//! variable utilities.

use anyhow::{Result, bail};
use tracing_subscriber::EnvFilter;

use toolchat_agent::LlmClientConfig;
use toolchat_agent::llm::{DEFAULT_ANTHROPIC_MODEL, DEFAULT_OPENAI_MODEL};

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins, then `TOOLCHAT_LOG`, then `default_level`.  Output goes
/// to stderr so it stays out of the chat transcript.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("TOOLCHAT_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// LLM provider resolution
// ---------------------------------------------------------------------------

/// Resolve which LLM provider, API key, and model to use from the process
/// environment.
///
/// `TOOLCHAT_PROVIDER` picks `openai` (default) or `anthropic`; the matching
/// API key variable must be set.  The model can be overridden with
/// `TOOLCHAT_MODEL` and an OpenAI-compatible endpoint with
/// `TOOLCHAT_API_BASE_URL`.
pub fn resolve_llm_config() -> Result<LlmClientConfig> {
    resolve_llm_config_with(env_non_empty)
}

/// [`resolve_llm_config`] over an arbitrary variable lookup.
fn resolve_llm_config_with(env: impl Fn(&str) -> Option<String>) -> Result<LlmClientConfig> {
    let provider = env("TOOLCHAT_PROVIDER").unwrap_or_else(|| "openai".to_owned());
    let model_override = env("TOOLCHAT_MODEL");
    let base_url_override = env("TOOLCHAT_API_BASE_URL");

    match provider.to_lowercase().as_str() {
        "openai" | "gpt" => {
            let Some(key) = env("OPENAI_API_KEY") else {
                bail!(no_key_message("openai", "OPENAI_API_KEY"));
            };
            let model = model_override.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_owned());
            Ok(match base_url_override {
                Some(base) => LlmClientConfig::openai_compatible(key, model, base),
                None => LlmClientConfig::openai(key, model),
            })
        }
        "anthropic" | "claude" => {
            let Some(key) = env("ANTHROPIC_API_KEY") else {
                bail!(no_key_message("anthropic", "ANTHROPIC_API_KEY"));
            };
            let model = model_override.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_owned());
            let mut cfg = LlmClientConfig::anthropic(key, model);
            if let Some(url) = base_url_override {
                cfg.base_url = url.trim_end_matches('/').to_owned();
            }
            Ok(cfg)
        }
        other => bail!("unknown provider '{other}' in TOOLCHAT_PROVIDER (expected openai or anthropic)"),
    }
}

/// Read a non-empty environment variable, returning `None` if unset or empty.
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn no_key_message(provider: &str, env_var: &str) -> String {
    format!("{provider} provider selected but no API key found; set it with `export {env_var}=...`")
}
