//! Configuration loaded from `~/.config/commentpulse/config.toml`.
//!
//! Every section is optional; a missing file yields [`Config::default`].
//! `YOUTUBE_API_KEY` and `COMMENTPULSE_DB` override the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PulseError, Result};

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub acquisition: AcquisitionConfig,
    pub scoring: ScoringConfig,
    pub monitor: MonitorConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
}

/// Which acquisition tiers are registered and how they talk to the network.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// YouTube Data API key. The API tier is only registered when set.
    pub api_key: Option<String>,
    /// Register the browser-automation comment tier.
    pub browser_enabled: bool,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            browser_enabled: true,
            request_timeout_secs: 15,
            user_agent: format!("commentpulse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Scoring strategy selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ScoringStrategy {
    /// Keyword lexicon only.
    Lexical,
    /// General-purpose polarity blended with the keyword lexicon.
    #[default]
    Augmented,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub strategy: ScoringStrategy,
    /// Weight of the general-purpose polarity in the blend. The lexicon
    /// affinity receives `1 - blend_weight`.
    pub blend_weight: f64,
    pub positive_threshold: f64,
    pub negative_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: ScoringStrategy::Augmented,
            blend_weight: 0.5,
            positive_threshold: 0.1,
            negative_threshold: -0.1,
        }
    }
}

/// Publish loop cadence and batch sizes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub batch_size: usize,
    /// How many of the newest fetched comments go into `new_comments`.
    pub recent_slice: usize,
    pub interval_secs: u64,
    pub backoff_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            recent_slice: 5,
            interval_secs: 30,
            backoff_secs: 60,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8765)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path. `:memory:` keeps everything in process.
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolved database path, defaulting to the user data directory.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("commentpulse")
                .join("commentpulse.db")
        })
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file is not an error. Environment overrides are applied
    /// afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map_or_else(config_path, Path::to_path_buf);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml_str(&content)
                .map_err(|e| PulseError::Config(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PulseError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("YOUTUBE_API_KEY") {
            if !key.trim().is_empty() {
                self.acquisition.api_key = Some(key);
            }
        }
        if let Ok(db) = std::env::var("COMMENTPULSE_DB") {
            if !db.trim().is_empty() {
                self.store.path = Some(PathBuf::from(db));
            }
        }
    }
}

/// Return the path to the config file.
fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("commentpulse")
        .join("config.toml")
}
