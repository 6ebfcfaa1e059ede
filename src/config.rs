// User configuration loaded from ~/.config/tunefeed/config.toml.
// Falls back to sensible defaults when the file is missing; the fetch knobs
// can also be overridden from the environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Application configuration, deserialized from `~/.config/tunefeed/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the feed API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User-Agent sent with every feed request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Maximum simultaneous upstream requests (default: 2).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Minimum spacing between request starts, in milliseconds (default: 400).
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

fn default_base_url() -> String {
    "https://www.reddit.com".to_string()
}

fn default_user_agent() -> String {
    format!("tunefeed/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_concurrency() -> usize {
    2
}

fn default_min_spacing_ms() -> u64 {
    400
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl Config {
    /// Read config from disk, or return defaults if the file doesn't exist.
    /// Environment variables win over the file for the fetch limiter knobs.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let mut config: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(n) = env_parse("TUNEFEED_MAX_CONCURRENCY") {
            self.fetch.max_concurrency = n;
        }
        if let Some(ms) = env_parse("TUNEFEED_MIN_SPACING_MS") {
            self.fetch.min_spacing_ms = ms;
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunefeed")
            .join("config.toml")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
