//! Refresh cycle and the trigger table that decides when to run it.
//!
//! One cycle is: fetch every endpoint, reconcile station readings, normalize
//! the forecast, build a snapshot. Stages take what they need from a
//! [`PipelineContext`] and hand back new values; the only shared state is the
//! [`SnapshotSlot`].

use chrono::{DateTime, Local, NaiveDate, Utc};
use std::{convert::TryFrom, str::FromStr, sync::Arc};

use crate::{
    cache::{CacheDecision, CacheGate, CacheStore},
    config::Config,
    forecast,
    model::{Location, WeatherSnapshot},
    provider::{Endpoint, NeaClient, ReadingSource, fetch_all},
    reconcile::reconcile,
    slot::SnapshotSlot,
    snapshot,
};

/// Inputs shared by every stage of one refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineContext {
    pub location: Location,
    pub captured_at: DateTime<Utc>,
    /// Calendar day used for today's forecast when the payload doesn't say.
    pub today: NaiveDate,
}

impl PipelineContext {
    pub fn new(location: Location, captured_at: DateTime<Utc>) -> Self {
        Self {
            location,
            captured_at,
            today: captured_at.with_timezone(&Local).date_naive(),
        }
    }
}

/// Run one full fetch-reconcile-build cycle. Never fails: total failure yields
/// the fallback snapshot.
pub async fn run(source: &dyn ReadingSource, ctx: &PipelineContext) -> WeatherSnapshot {
    let batch = fetch_all(source, Endpoint::all()).await;

    if batch.all_failed() {
        tracing::warn!("every weather endpoint failed; using fallback snapshot");
        return snapshot::fallback_snapshot(ctx.captured_at);
    }

    let readings = reconcile(&batch);
    let forecast = forecast::normalize(
        batch.payload(Endpoint::ShortRangeForecast),
        batch.payload(Endpoint::MultiDayForecast),
        ctx.today,
    );

    snapshot::build(&readings, forecast, ctx.captured_at)
}

/// Lifecycle and user events that can ask for weather.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    PageLoad,
    ManualRefresh,
    ConnectivityRestored,
    LocationChanged,
    CacheExpired,
}

/// What a trigger does with the cache before deciding to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Reuse the persisted record if it is younger than `cache_max_age`.
    ReuseCached,
    /// Refetch only if the current snapshot is older than `weather_refresh_interval`.
    RefreshIfStale,
    Force,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::PageLoad => "page-load",
            Trigger::ManualRefresh => "manual-refresh",
            Trigger::ConnectivityRestored => "connectivity-restored",
            Trigger::LocationChanged => "location-changed",
            Trigger::CacheExpired => "cache-expired",
        }
    }

    pub const fn all() -> &'static [Trigger] {
        &[
            Trigger::PageLoad,
            Trigger::ManualRefresh,
            Trigger::ConnectivityRestored,
            Trigger::LocationChanged,
            Trigger::CacheExpired,
        ]
    }

    pub fn policy(&self) -> RefreshPolicy {
        match self {
            Trigger::PageLoad => RefreshPolicy::ReuseCached,
            Trigger::CacheExpired => RefreshPolicy::RefreshIfStale,
            Trigger::ManualRefresh | Trigger::ConnectivityRestored | Trigger::LocationChanged => {
                RefreshPolicy::Force
            }
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Trigger {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();
        Trigger::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| {
                let known: Vec<&str> = Trigger::all().iter().map(Trigger::as_str).collect();
                anyhow::anyhow!("Unknown trigger '{value}'. Supported triggers: {}.", known.join(", "))
            })
    }
}

impl FromStr for Trigger {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Trigger::try_from(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// An existing snapshot was fresh enough.
    Reused(Arc<WeatherSnapshot>),
    Refreshed(Arc<WeatherSnapshot>),
    /// A newer refresh was issued while this one was in flight; its result was dropped.
    Superseded,
}

impl DispatchOutcome {
    pub fn snapshot(&self) -> Option<&Arc<WeatherSnapshot>> {
        match self {
            DispatchOutcome::Reused(s) | DispatchOutcome::Refreshed(s) => Some(s),
            DispatchOutcome::Superseded => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DispatchOutcome::Reused(_) => "reused",
            DispatchOutcome::Refreshed(_) => "refreshed",
            DispatchOutcome::Superseded => "superseded",
        }
    }
}

/// Owns the current snapshot and runs refreshes on behalf of triggers.
#[derive(Debug)]
pub struct WeatherService {
    source: Arc<dyn ReadingSource>,
    store: Option<CacheStore>,
    location: Location,
    record_gate: CacheGate,
    weather_gate: CacheGate,
    slot: SnapshotSlot,
}

impl WeatherService {
    pub fn new(config: &Config, source: Arc<dyn ReadingSource>, store: Option<CacheStore>) -> Self {
        Self {
            source,
            store,
            location: config.location.clone(),
            record_gate: CacheGate::new(config.cache_max_age()),
            weather_gate: CacheGate::new(config.weather_refresh_interval()),
            slot: SnapshotSlot::new(),
        }
    }

    /// Service talking to the configured API and persisting to the configured cache file.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        let client = NeaClient::new(config.api_base.clone(), config.request_timeout())?;
        let store = CacheStore::new(config.cache_file_path()?);
        Ok(Self::new(config, Arc::new(client), Some(store)))
    }

    pub fn current(&self) -> Option<Arc<WeatherSnapshot>> {
        self.slot.current()
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub async fn dispatch(&self, trigger: Trigger, now: DateTime<Utc>) -> DispatchOutcome {
        tracing::debug!(%trigger, "dispatching");

        match trigger.policy() {
            RefreshPolicy::ReuseCached => {
                if let Some(snapshot) = self.restore_from_cache(now) {
                    return DispatchOutcome::Reused(snapshot);
                }
            }
            RefreshPolicy::RefreshIfStale => {
                let current = self.slot.current().or_else(|| self.restore_from_cache(now));
                if let Some(snapshot) = current {
                    if self.weather_gate.decide(snapshot.captured_at, now) == CacheDecision::Reuse {
                        return DispatchOutcome::Reused(snapshot);
                    }
                }
            }
            RefreshPolicy::Force => {}
        }

        self.refresh(now).await
    }

    /// Run a refresh cycle and publish it unless a newer one has been issued meanwhile.
    pub async fn refresh(&self, now: DateTime<Utc>) -> DispatchOutcome {
        let ticket = self.slot.begin_refresh();
        let ctx = PipelineContext::new(self.location.clone(), now);

        let snapshot = run(self.source.as_ref(), &ctx).await;

        let Some(published) = self.slot.publish(ticket, snapshot) else {
            return DispatchOutcome::Superseded;
        };

        tracing::info!(
            sequence = ticket.sequence(),
            suitability = %published.suitability,
            fallback = published.is_fallback,
            "weather refreshed"
        );

        if let Some(store) = &self.store {
            if let Err(e) = store.store_weather(&published, &self.location, now) {
                tracing::warn!("Failed to persist weather: {e:#}");
            }
        }

        DispatchOutcome::Refreshed(published)
    }

    /// Seed the slot from a fresh persisted record, if there is one.
    fn restore_from_cache(&self, now: DateTime<Utc>) -> Option<Arc<WeatherSnapshot>> {
        let record = self.store.as_ref()?.load()?;
        let snapshot = self.record_gate.reusable(&record, now)?.clone();
        self.slot.seed(snapshot);
        self.slot.current()
    }
}
