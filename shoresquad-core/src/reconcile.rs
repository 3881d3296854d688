//! Picks one representative value per station parameter out of the raw payloads.
//!
//! Selection is "first reporting station, first reading". Station proximity is
//! not considered, so a reading from the far side of the island is as good as
//! one from the beach itself.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::{
    model::{Parameter, StationReading},
    provider::{Endpoint, FetchBatch},
};

#[derive(Debug, Deserialize)]
struct ReadingsPayload {
    #[serde(default)]
    items: Vec<ReadingsItem>,
}

#[derive(Debug, Deserialize)]
struct ReadingsItem {
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    readings: Vec<Map<String, Value>>,
    #[serde(default)]
    index: Vec<Map<String, Value>>,
}

/// Key some station payloads use instead of `value`.
fn legacy_key(parameter: Parameter) -> &'static str {
    match parameter {
        Parameter::Temperature => "temperature",
        Parameter::Humidity => "humidity",
        Parameter::WindSpeed => "wind_speed",
        Parameter::WindDirection => "wind_direction",
        Parameter::UvIndex => "uv_index",
    }
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

pub(crate) fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse one parameter's payload. Returns `None` when the payload shape is unusable;
/// a well-formed payload without a numeric first reading yields `value: None`.
pub fn parse_reading(parameter: Parameter, payload: &Value) -> Option<StationReading> {
    let parsed = ReadingsPayload::deserialize(payload).ok()?;
    let item = parsed.items.first()?;

    let entries = match parameter {
        Parameter::UvIndex => &item.index,
        _ => &item.readings,
    };

    let value = entries.first().and_then(|first| {
        finite(first.get("value")).or_else(|| finite(first.get(legacy_key(parameter))))
    });

    let source_timestamp = parse_timestamp(item.timestamp.as_ref())
        .or_else(|| parse_timestamp(entries.first().and_then(|e| e.get("timestamp"))));

    Some(StationReading {
        parameter,
        value,
        source_timestamp,
    })
}

/// One value per parameter; parameters without a usable reading are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciledReadings {
    values: HashMap<Parameter, f64>,
    observed_at: Option<DateTime<Utc>>,
}

impl ReconciledReadings {
    pub fn get(&self, parameter: Parameter) -> Option<f64> {
        self.values.get(&parameter).copied()
    }

    pub fn is_available(&self, parameter: Parameter) -> bool {
        self.values.contains_key(&parameter)
    }

    /// Most recent station timestamp among the readings used.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.observed_at
    }

    pub fn with_value(mut self, parameter: Parameter, value: f64) -> Self {
        if value.is_finite() {
            self.values.insert(parameter, value);
        }
        self
    }
}

/// Reconcile every station parameter in the batch. Never fails.
pub fn reconcile(batch: &FetchBatch) -> ReconciledReadings {
    let mut out = ReconciledReadings::default();

    for &parameter in Parameter::all() {
        let reading = batch
            .payload(Endpoint::for_parameter(parameter))
            .and_then(|payload| parse_reading(parameter, payload));

        match reading {
            Some(StationReading { value: Some(value), source_timestamp, .. }) => {
                out.values.insert(parameter, value);
                out.observed_at = out.observed_at.max(source_timestamp);
            }
            _ => tracing::debug!(%parameter, "reading unavailable"),
        }
    }

    out
}
