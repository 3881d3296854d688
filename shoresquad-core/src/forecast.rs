//! Merges the 24-hour and multi-day forecast payloads into one day-by-day sequence.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use crate::model::ForecastDay;

/// Extended (multi-day) entries kept after today.
pub const MAX_EXTENDED_DAYS: usize = 7;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ShortRangeItem {
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(default)]
    valid_period: Option<ValidPeriod>,
    #[serde(default)]
    general: Option<General>,
}

#[derive(Debug, Deserialize)]
struct ValidPeriod {
    #[serde(default)]
    start: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct General {
    #[serde(default)]
    forecast: Option<Value>,
    #[serde(default)]
    temperature: Option<Range>,
    #[serde(default)]
    relative_humidity: Option<Range>,
}

#[derive(Debug, Deserialize)]
struct Range {
    #[serde(default)]
    low: Option<Value>,
    #[serde(default)]
    high: Option<Value>,
}

impl Range {
    fn bounds(&self) -> Option<(f64, f64)> {
        Some((finite(self.low.as_ref())?, finite(self.high.as_ref())?))
    }
}

#[derive(Debug, Deserialize)]
struct MultiDayItem {
    #[serde(default)]
    forecasts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct MultiDayEntry {
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    forecast: Option<Value>,
    #[serde(default)]
    temperature: Option<Range>,
    #[serde(default)]
    relative_humidity: Option<Range>,
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Forecast text is either a bare string or `{ "text": ... }`.
fn description(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.as_str(),
        Value::Object(o) => o.get("text").and_then(Value::as_str)?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Accepts a bare date or an RFC 3339 timestamp; the latter keeps its own offset's calendar day.
fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedForecast {
    /// General description from the short-range forecast, if any.
    pub current_description: Option<String>,
    pub days: Vec<ForecastDay>,
}

fn short_range(payload: &Value, today: NaiveDate) -> (Option<String>, Option<ForecastDay>) {
    let Ok(envelope) = Envelope::<ShortRangeItem>::deserialize(payload) else {
        return (None, None);
    };
    let Some(item) = envelope.items.into_iter().next() else {
        return (None, None);
    };
    let Some(general) = item.general else {
        return (None, None);
    };

    let text = description(general.forecast.as_ref());
    let date = item
        .valid_period
        .and_then(|p| parse_date(p.start.as_ref()))
        .or_else(|| parse_date(item.timestamp.as_ref()))
        .unwrap_or(today);
    let humidity = general.relative_humidity.as_ref().and_then(Range::bounds);

    let day = match (&text, general.temperature.as_ref().and_then(Range::bounds)) {
        (Some(text), Some((low, high))) => Some(ForecastDay {
            date,
            short_description: text.clone(),
            temperature_high: high,
            temperature_low: low,
            humidity_high: humidity.map(|(_, h)| h),
            humidity_low: humidity.map(|(l, _)| l),
        }),
        _ => None,
    };

    (text, day)
}

fn multi_day(payload: &Value) -> Vec<ForecastDay> {
    let Ok(envelope) = Envelope::<MultiDayItem>::deserialize(payload) else {
        return Vec::new();
    };
    let Some(item) = envelope.items.into_iter().next() else {
        return Vec::new();
    };

    item.forecasts
        .iter()
        .filter_map(|raw| {
            let entry = MultiDayEntry::deserialize(raw).ok()?;
            let (low, high) = entry.temperature.as_ref()?.bounds()?;
            let humidity = entry.relative_humidity.as_ref().and_then(Range::bounds);
            Some(ForecastDay {
                date: parse_date(entry.date.as_ref())?,
                short_description: description(entry.forecast.as_ref())?,
                temperature_high: high,
                temperature_low: low,
                humidity_high: humidity.map(|(_, h)| h),
                humidity_low: humidity.map(|(l, _)| l),
            })
        })
        .collect()
}

/// Build the forecast sequence: today from the short-range payload, then up to
/// [`MAX_EXTENDED_DAYS`] multi-day entries in upstream order, skipping any that
/// would step back in time. Missing payloads
/// or unusable entries shrink the sequence; nothing is invented.
pub fn normalize(
    short_range_payload: Option<&Value>,
    multi_day_payload: Option<&Value>,
    today: NaiveDate,
) -> NormalizedForecast {
    let (current_description, first) = short_range_payload
        .map(|p| short_range(p, today))
        .unwrap_or((None, None));

    // Entries dated before the last kept day are dropped so the sequence never goes backwards.
    let mut latest = first.as_ref().map(|d| d.date);
    let extended = multi_day_payload
        .map(multi_day)
        .unwrap_or_default()
        .into_iter()
        .filter(move |d| {
            if latest.is_some_and(|l| d.date < l) {
                return false;
            }
            latest = Some(d.date);
            true
        })
        .take(MAX_EXTENDED_DAYS);

    NormalizedForecast {
        current_description,
        days: first.into_iter().chain(extended).collect(),
    }
}
