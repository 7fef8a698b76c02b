// src/config.rs
use anyhow::{Context, bail};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::llm_service::Provider;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub default_provider: Provider,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    pub static_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            default_provider: Provider::OpenAI,
            openai_api_key: None,
            openai_model: "gpt-4o".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            anthropic_api_key: None,
            anthropic_model: "claude-3-5-sonnet-20241022".to_string(),
            anthropic_base_url: "https://api.anthropic.com/v1".to_string(),
            max_tokens: 1500,
            request_timeout: Duration::from_secs(60),
            static_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("UXLENS_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(provider) = get("UXLENS_PROVIDER") {
            config.default_provider = Provider::from_str(&provider)
                .with_context(|| format!("UXLENS_PROVIDER={}", provider))?;
        }

        config.openai_api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("OPENAI_MODEL") {
            config.openai_model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            config.openai_base_url = url;
        }

        config.anthropic_api_key = get("ANTHROPIC_API_KEY");
        if let Some(model) = get("ANTHROPIC_MODEL") {
            config.anthropic_model = model;
        }
        if let Some(url) = get("ANTHROPIC_BASE_URL") {
            config.anthropic_base_url = url;
        }

        if let Some(tokens) = get("UXLENS_MAX_TOKENS") {
            config.max_tokens = tokens
                .parse()
                .with_context(|| format!("UXLENS_MAX_TOKENS must be a number, got {:?}", tokens))?;
        }
        if let Some(secs) = get("UXLENS_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().with_context(|| {
                format!("UXLENS_REQUEST_TIMEOUT_SECS must be a number, got {:?}", secs)
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.static_dir = get("UXLENS_STATIC_DIR").map(PathBuf::from);

        let default_key = match config.default_provider {
            Provider::OpenAI => ("OPENAI_API_KEY", &config.openai_api_key),
            Provider::Anthropic => ("ANTHROPIC_API_KEY", &config.anthropic_api_key),
        };
        if default_key.1.is_none() {
            bail!(
                "{} must be set when the default provider is {}",
                default_key.0,
                config.default_provider
            );
        }

        Ok(config)
    }
}
