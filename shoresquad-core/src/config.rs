use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{model::Location, provider::nea::DEFAULT_API_BASE};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 60 * 60;
pub const DEFAULT_WEATHER_REFRESH_INTERVAL_SECS: u64 = 5 * 60;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_base = "https://api.data.gov.sg/v1/environment"
/// cache_max_age_secs = 3600
///
/// [location]
/// name = "Pasir Ris Beach"
/// lat = 1.381497
/// lng = 103.955574
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the environment API; endpoint names are appended to it.
    pub api_base: String,

    /// Applied to every upstream request individually.
    pub request_timeout_secs: u64,

    /// How long a whole cached record stays usable at startup.
    pub cache_max_age_secs: u64,

    /// How long the weather slice stays current before a cache-expired trigger refetches it.
    pub weather_refresh_interval_secs: u64,

    /// Overrides the platform cache location.
    pub cache_path: Option<PathBuf>,

    pub location: Location,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            weather_refresh_interval_secs: DEFAULT_WEATHER_REFRESH_INTERVAL_SECS,
            cache_path: None,
            location: Location::default(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_max_age(&self) -> chrono::Duration {
        secs(self.cache_max_age_secs)
    }

    pub fn weather_refresh_interval(&self) -> chrono::Duration {
        secs(self.weather_refresh_interval_secs)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(anyhow!("api_base must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }
        if !(-90.0..=90.0).contains(&self.location.lat)
            || !(-180.0..=180.0).contains(&self.location.lng)
        {
            return Err(anyhow!(
                "location ({}, {}) is not a valid coordinate",
                self.location.lat,
                self.location.lng
            ));
        }
        Ok(())
    }

    /// Load config from the platform location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the cached record, honouring `cache_path`.
    pub fn cache_file_path(&self) -> Result<PathBuf> {
        match &self.cache_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.cache_dir().join("cache.json")),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("sg", "shoresquad", "shoresquad")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}

/// Saturates at `chrono::Duration::MAX` instead of panicking on huge values.
fn secs(value: u64) -> chrono::Duration {
    i64::try_from(value)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
