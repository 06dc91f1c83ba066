//! YAML configuration loading.
//!
//! Endpoints and crawl tuning live in a `config.yaml`; secrets can instead
//! come from the environment (`LLM_API_KEY`, `STORE_API_KEY`), which wins
//! over the file so the file can be committed without credentials.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

fn default_lookup_delay_ms() -> u64 {
    250
}

fn default_settle_delay_ms() -> u64 {
    1500
}

fn default_episode_batch_size() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Override for the politician registry API root; the public endpoint is
    /// used when absent.
    #[serde(default)]
    pub registry_base_url: Option<String>,

    pub llm: LlmConfig,
    pub store: StoreConfig,

    /// Delay between consecutive registry lookups, in milliseconds.
    #[serde(default = "default_lookup_delay_ms")]
    pub lookup_delay_ms: u64,

    /// Wait after each listing load step, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Episode pages fetched concurrently per batch.
    #[serde(default = "default_episode_batch_size")]
    pub episode_batch_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

/// Load configuration from a YAML file and apply environment overrides.
pub fn load(path: &str) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    let mut config: Config =
        serde_yaml::from_str(&raw).with_context(|| format!("invalid config file {path}"))?;

    if let Ok(key) = env::var("LLM_API_KEY") {
        config.llm.api_key = key;
    }
    if let Ok(key) = env::var("STORE_API_KEY") {
        config.store.api_key = key;
    }

    info!(path, "loaded configuration");
    Ok(config)
}
