use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::provider::Provider;

/// Limit used when neither `--limit` nor the config file sets one.
pub const DEFAULT_LIMIT: usize = 200;

const CONFIG_FILE: &str = ".pr-overlap.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid limit in config file: must be a positive integer")]
    InvalidLimit,
}

/// Top-level configuration loaded from .pr-overlap.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Force a provider instead of detecting it from the remote host
    pub provider: Option<Provider>,

    /// Default maximum number of open pull requests to inspect
    pub limit: Option<usize>,

    #[serde(default)]
    pub github: ProviderConfig,

    #[serde(default)]
    pub gitlab: ProviderConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderConfig {
    /// API token. If None, falls back to the provider's token env var.
    pub token: Option<String>,
    /// REST API base URL, for self-hosted instances
    pub api_base: Option<String>,
}

impl Config {
    /// Load configuration from .pr-overlap.toml in the current directory.
    /// Returns default config if the file doesn't exist. Tokens missing
    /// from the file are taken from GITHUB_TOKEN / GITLAB_TOKEN.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        if config.limit == Some(0) {
            return Err(ConfigError::InvalidLimit);
        }
        Ok(config)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for provider in [Provider::GitHub, Provider::GitLab] {
            let section = self.section_mut(provider);
            if section.token.is_none() {
                section.token = lookup(provider.token_env()).filter(|t| !t.is_empty());
            }
        }
    }

    fn section(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::GitHub => &self.github,
            Provider::GitLab => &self.gitlab,
        }
    }

    fn section_mut(&mut self, provider: Provider) -> &mut ProviderConfig {
        match provider {
            Provider::GitHub => &mut self.github,
            Provider::GitLab => &mut self.gitlab,
        }
    }

    /// Access token for `provider`: config file value, else env var.
    pub fn token_for(&self, provider: Provider) -> Option<String> {
        self.section(provider).token.clone()
    }

    pub fn api_base_for(&self, provider: Provider) -> String {
        self.section(provider)
            .api_base
            .clone()
            .unwrap_or_else(|| provider.default_api_base().to_string())
    }

    /// `--limit` wins over the config file, which wins over the default.
    pub fn effective_limit(&self, cli_limit: Option<usize>) -> usize {
        cli_limit.or(self.limit).unwrap_or(DEFAULT_LIMIT)
    }
}
