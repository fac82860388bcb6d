//! Global options, resolved from flags and environment.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use habicase_ai::{LlmClient, LlmConfig};

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding the saved case
    #[arg(long, global = true, env = "HABICASE_DATA_DIR", default_value = ".habicase")]
    pub data_dir: PathBuf,

    /// Anthropic API key, needed by commands that call the model
    #[arg(long, global = true, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for analysis and reports
    #[arg(long, global = true, env = "HABICASE_MODEL", default_value = "claude-sonnet-4-5")]
    pub model: String,

    /// Messages API endpoint
    #[arg(
        long,
        global = true,
        env = "HABICASE_API_URL",
        default_value = "https://api.anthropic.com/v1/messages"
    )]
    pub api_url: String,
}

impl GlobalArgs {
    /// Build the LLM client. Fails when no API key is configured.
    pub fn llm_client(&self) -> anyhow::Result<LlmClient> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("no API key: pass --api-key or set ANTHROPIC_API_KEY")?;
        let mut config = LlmConfig::new(api_key);
        config.model = self.model.clone();
        config.base_url = self.api_url.clone();
        LlmClient::new(config).context("failed to build LLM client")
    }
}
