//! Combines reconciled readings and the normalized forecast into a [`WeatherSnapshot`].
//!
//! Every numeric field ends up either live and finite or one of the fallback
//! constants below. `is_fallback` records whether any substitution happened.

use chrono::{DateTime, Utc};

use crate::{
    forecast::NormalizedForecast,
    model::{Parameter, Suitability, WeatherIcon, WeatherSnapshot},
    reconcile::ReconciledReadings,
};

pub const FALLBACK_TEMPERATURE: f64 = 28.0;
/// Added to the temperature to estimate how warm it feels on the sand.
pub const FEELS_LIKE_OFFSET: f64 = 2.0;
pub const FALLBACK_HUMIDITY: f64 = 75.0;
/// Notional 8.1 knots.
pub const FALLBACK_WIND_SPEED_KMH: f64 = 15.0;
pub const FALLBACK_WIND_DIRECTION_DEG: f64 = 180.0;
pub const FALLBACK_UV_INDEX: f64 = 6.0;
pub const FALLBACK_DESCRIPTION: &str = "Partly Cloudy";
/// Suitability reported when nothing at all could be fetched.
pub const FALLBACK_SUITABILITY: Suitability = Suitability::Good;

const KMH_PER_KNOT: f64 = 1.852;

/// Convert knots to km/h, rounded to one decimal place.
pub fn knots_to_kmh(knots: f64) -> f64 {
    (knots * KMH_PER_KNOT * 10.0).round() / 10.0
}

/// Classify cleanup conditions from live readings. Wind is in knots.
///
/// Checked in order: no data at all is `Okay`; thunder, heavy rain, wind above
/// 15 knots or temperature above 35 is `Poor`; 24-32 degrees with light or
/// unknown wind and no rain is `Perfect`; anything else is `Good`.
pub fn classify(
    temperature: Option<f64>,
    wind_knots: Option<f64>,
    description: Option<&str>,
) -> Suitability {
    if temperature.is_none() && wind_knots.is_none() && description.is_none() {
        return Suitability::Okay;
    }

    let desc = description.map(str::to_lowercase).unwrap_or_default();

    if desc.contains("thunder")
        || desc.contains("heavy rain")
        || wind_knots.is_some_and(|w| w > 15.0)
        || temperature.is_some_and(|t| t > 35.0)
    {
        return Suitability::Poor;
    }

    if temperature.is_some_and(|t| (24.0..=32.0).contains(&t))
        && wind_knots.is_none_or(|w| w <= 10.0)
        && !desc.contains("rain")
    {
        return Suitability::Perfect;
    }

    Suitability::Good
}

/// Snapshot used when the whole pipeline came back empty.
pub fn fallback_snapshot(captured_at: DateTime<Utc>) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature: FALLBACK_TEMPERATURE,
        feels_like: FALLBACK_TEMPERATURE + FEELS_LIKE_OFFSET,
        humidity: FALLBACK_HUMIDITY,
        wind_speed_kmh: FALLBACK_WIND_SPEED_KMH,
        wind_direction_deg: FALLBACK_WIND_DIRECTION_DEG,
        uv_index: FALLBACK_UV_INDEX,
        description: FALLBACK_DESCRIPTION.to_string(),
        icon: WeatherIcon::from_description(FALLBACK_DESCRIPTION),
        suitability: FALLBACK_SUITABILITY,
        forecast: Vec::new(),
        is_fallback: true,
        captured_at,
    }
}

/// Build a snapshot, substituting fallback constants field by field.
pub fn build(
    readings: &ReconciledReadings,
    forecast: NormalizedForecast,
    captured_at: DateTime<Utc>,
) -> WeatherSnapshot {
    let mut substituted = Vec::new();
    let mut or_fallback = |parameter: Parameter, fallback: f64| {
        readings.get(parameter).unwrap_or_else(|| {
            substituted.push(parameter.as_str());
            fallback
        })
    };

    let temperature = or_fallback(Parameter::Temperature, FALLBACK_TEMPERATURE);
    let humidity = or_fallback(Parameter::Humidity, FALLBACK_HUMIDITY);
    let wind_direction_deg = or_fallback(Parameter::WindDirection, FALLBACK_WIND_DIRECTION_DEG);
    let uv_index = or_fallback(Parameter::UvIndex, FALLBACK_UV_INDEX);

    let wind_knots = readings.get(Parameter::WindSpeed);
    let wind_speed_kmh = match wind_knots {
        Some(knots) => knots_to_kmh(knots),
        None => {
            substituted.push(Parameter::WindSpeed.as_str());
            FALLBACK_WIND_SPEED_KMH
        }
    };

    let live_description = forecast.current_description;
    let description = match &live_description {
        Some(d) => d.clone(),
        None => {
            substituted.push("description");
            FALLBACK_DESCRIPTION.to_string()
        }
    };

    let suitability = classify(
        readings.get(Parameter::Temperature),
        wind_knots,
        live_description.as_deref(),
    );

    if !substituted.is_empty() {
        tracing::info!(fields = ?substituted, "substituted fallback values");
    }

    WeatherSnapshot {
        temperature,
        feels_like: temperature + FEELS_LIKE_OFFSET,
        humidity,
        wind_speed_kmh,
        wind_direction_deg,
        uv_index,
        icon: WeatherIcon::from_description(&description),
        description,
        suitability,
        forecast: forecast.days,
        is_fallback: !substituted.is_empty(),
        captured_at,
    }
}

/// Wind speed as shown to users, e.g. `18.5`.
pub fn format_kmh(kmh: f64) -> String {
    format!("{kmh:.1}")
}
