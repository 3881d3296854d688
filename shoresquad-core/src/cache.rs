use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::{Location, WeatherSnapshot};

/// Everything persisted between runs, written as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Cleanup events, owned by the events view and carried through untouched.
    #[serde(default)]
    pub events: Vec<serde_json::Value>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub weather: Option<WeatherSnapshot>,
    /// Unix milliseconds at which the record was written.
    pub timestamp: i64,
}

impl CacheRecord {
    pub fn stored_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    Reuse,
    Refresh,
}

/// Decides whether something captured at a given time is still fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGate {
    threshold: Duration,
}

impl CacheGate {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Reuse iff `now - captured_at < threshold`.
    pub fn decide(&self, captured_at: DateTime<Utc>, now: DateTime<Utc>) -> CacheDecision {
        if now - captured_at < self.threshold {
            CacheDecision::Reuse
        } else {
            CacheDecision::Refresh
        }
    }

    /// The stored snapshot, if the record as a whole is fresh.
    pub fn reusable<'a>(
        &self,
        record: &'a CacheRecord,
        now: DateTime<Utc>,
    ) -> Option<&'a WeatherSnapshot> {
        let stored_at = record.stored_at()?;
        match self.decide(stored_at, now) {
            CacheDecision::Reuse => record.weather.as_ref(),
            CacheDecision::Refresh => None,
        }
    }
}

/// File-backed store for the single [`CacheRecord`].
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record. A missing, unreadable or corrupt file is a cache miss.
    pub fn load(&self) -> Option<CacheRecord> {
        if !self.path.exists() {
            return None;
        }

        let parsed = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))
            .and_then(|contents| {
                serde_json::from_str::<CacheRecord>(&contents)
                    .with_context(|| format!("Failed to parse cache file: {}", self.path.display()))
            });

        match parsed {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Ignoring cache: {e:#}");
                None
            }
        }
    }

    /// Write the record, replacing any previous one in a single rename.
    pub fn save(&self, record: &CacheRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string(record).context("Failed to serialize cache record")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write cache file: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace cache file: {}", self.path.display()))?;

        Ok(())
    }

    /// Persist `weather` with a fresh timestamp, keeping the other slices of any existing record.
    pub fn store_weather(
        &self,
        weather: &WeatherSnapshot,
        location: &Location,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let previous = self.load().unwrap_or_default();
        let record = CacheRecord {
            events: previous.events,
            location: Some(location.clone()),
            weather: Some(weather.clone()),
            timestamp: now.timestamp_millis(),
        };
        self.save(&record)
    }
}
