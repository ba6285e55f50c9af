use crate::core::fallback::{SUPPORTED_CURRENCIES, fallback_table};
use crate::core::rate::RateTable;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://exchange-rate-travel-app-production.up.railway.app";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PollingConfig {
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            health_check_interval_secs: default_health_check_interval_secs(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl PollingConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SnapshotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub persist: bool,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            enabled: true,
            persist: false,
            ttl_hours: default_ttl_hours(),
        }
    }
}

impl SnapshotConfig {
    /// `None` means snapshots never expire.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_hours > 0).then(|| Duration::from_secs(self.ttl_hours * 3600))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    /// USD-anchored entries layered over the embedded fallback table
    #[serde(default)]
    pub fallback_rates: BTreeMap<String, f64>,
    #[serde(default = "default_currencies")]
    pub currencies: Vec<String>,
    pub data_path: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_health_check_interval_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_ttl_hours() -> u64 {
    24
}

fn default_true() -> bool {
    true
}

fn default_currencies() -> Vec<String> {
    SUPPORTED_CURRENCIES
        .iter()
        .map(|c| c.code.to_string())
        .collect()
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults when
    /// no file exists there yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::with_defaults());
        }
        Self::load_from_path(&config_path)
    }

    pub fn with_defaults() -> Self {
        Self {
            currencies: default_currencies(),
            ..Self::default()
        }
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "xrate", "xrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "xrate", "xrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Fallback overrides must be usable rates, or the offline table could no
    /// longer resolve every supported pair.
    pub fn validate(&self) -> Result<()> {
        for (code, rate) in &self.fallback_rates {
            if !(rate.is_finite() && *rate > 0.0) {
                anyhow::bail!("fallback_rates.{code} must be a positive number, got {rate}");
            }
        }
        Ok(())
    }

    /// The embedded fallback table with any configured overrides applied.
    /// Overrides that are not positive are ignored.
    pub fn fallback_table(&self) -> RateTable {
        fallback_table().merged_with(
            self.fallback_rates
                .iter()
                .filter(|(_, rate)| rate.is_finite() && **rate > 0.0)
                .map(|(code, rate)| (code, *rate)),
        )
    }
}
