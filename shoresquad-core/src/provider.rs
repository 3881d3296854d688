use crate::model::Parameter;
use async_trait::async_trait;
use futures::future::join_all;
use std::{collections::HashMap, convert::TryFrom, fmt::Debug};

pub mod nea;

pub use nea::NeaClient;

/// Upstream resources, one per station parameter plus the two forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AirTemperature,
    RelativeHumidity,
    WindSpeed,
    WindDirection,
    UvIndex,
    ShortRangeForecast,
    MultiDayForecast,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::AirTemperature => "air-temperature",
            Endpoint::RelativeHumidity => "relative-humidity",
            Endpoint::WindSpeed => "wind-speed",
            Endpoint::WindDirection => "wind-direction",
            Endpoint::UvIndex => "uv-index",
            Endpoint::ShortRangeForecast => "24-hour-weather-forecast",
            Endpoint::MultiDayForecast => "4-day-weather-forecast",
        }
    }

    pub const fn all() -> &'static [Endpoint] {
        &[
            Endpoint::AirTemperature,
            Endpoint::RelativeHumidity,
            Endpoint::WindSpeed,
            Endpoint::WindDirection,
            Endpoint::UvIndex,
            Endpoint::ShortRangeForecast,
            Endpoint::MultiDayForecast,
        ]
    }

    pub fn for_parameter(parameter: Parameter) -> Self {
        match parameter {
            Parameter::Temperature => Endpoint::AirTemperature,
            Parameter::Humidity => Endpoint::RelativeHumidity,
            Parameter::WindSpeed => Endpoint::WindSpeed,
            Parameter::WindDirection => Endpoint::WindDirection,
            Parameter::UvIndex => Endpoint::UvIndex,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Endpoint {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Endpoint::all()
            .iter()
            .copied()
            .find(|e| e.as_str() == value)
            .ok_or_else(|| anyhow::anyhow!("Unknown endpoint '{value}'."))
    }
}

/// Why a single endpoint produced no payload.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: Endpoint },

    #[error("request to {endpoint} failed: {source}")]
    Network {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} responded with status {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    #[error("{endpoint} returned a body that is not JSON: {source}")]
    Malformed {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

/// A source of raw upstream payloads, one JSON document per endpoint.
#[async_trait]
pub trait ReadingSource: Send + Sync + Debug {
    async fn fetch(&self, endpoint: Endpoint) -> Result<serde_json::Value, FetchError>;
}

pub type FetchOutcome = Result<serde_json::Value, FetchError>;

/// Settled outcomes of one refresh's requests, keyed by endpoint.
#[derive(Debug, Default)]
pub struct FetchBatch {
    outcomes: HashMap<Endpoint, FetchOutcome>,
}

impl FetchBatch {
    pub fn new(outcomes: HashMap<Endpoint, FetchOutcome>) -> Self {
        Self { outcomes }
    }

    /// Payload for `endpoint`, if it was requested and succeeded.
    pub fn payload(&self, endpoint: Endpoint) -> Option<&serde_json::Value> {
        self.outcomes.get(&endpoint).and_then(|o| o.as_ref().ok())
    }

    pub fn outcome(&self, endpoint: Endpoint) -> Option<&FetchOutcome> {
        self.outcomes.get(&endpoint)
    }

    pub fn failed(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_err())
            .map(|(e, _)| *e)
    }

    /// True when nothing was requested or every request failed.
    pub fn all_failed(&self) -> bool {
        self.outcomes.values().all(|o| o.is_err())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Request every endpoint concurrently and wait for all of them to settle.
///
/// Individual failures are recorded in the batch; this never fails as a whole.
pub async fn fetch_all(source: &dyn ReadingSource, endpoints: &[Endpoint]) -> FetchBatch {
    let requests = endpoints.iter().map(|&endpoint| async move {
        let outcome = source.fetch(endpoint).await;
        match &outcome {
            Ok(_) => tracing::debug!(%endpoint, "fetched"),
            Err(e) => tracing::warn!(%endpoint, error = %e, "fetch failed"),
        }
        (endpoint, outcome)
    });

    let outcomes = join_all(requests).await.into_iter().collect();
    FetchBatch::new(outcomes)
}
