use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Atmospheric parameters read from individual weather stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    Temperature,
    Humidity,
    WindSpeed,
    WindDirection,
    UvIndex,
}

impl Parameter {
    pub const fn all() -> &'static [Parameter] {
        &[
            Parameter::Temperature,
            Parameter::Humidity,
            Parameter::WindSpeed,
            Parameter::WindDirection,
            Parameter::UvIndex,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::WindSpeed => "windSpeed",
            Parameter::WindDirection => "windDirection",
            Parameter::UvIndex => "uvIndex",
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parameter's value as reported by the first station, prior to reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReading {
    pub parameter: Parameter,
    pub value: Option<f64>,
    pub source_timestamp: Option<DateTime<Utc>>,
}

/// One day of forecast. Index 0 of a forecast sequence is today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub short_description: String,
    pub temperature_high: f64,
    pub temperature_low: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity_low: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherIcon {
    Sun,
    Cloud,
    Rain,
    Storm,
}

impl WeatherIcon {
    /// Derive an icon from a free-text forecast description.
    ///
    /// Matching is a case-insensitive substring search, checked in order:
    /// rain, cloud, storm, sun. Anything unrecognised is drawn as a cloud.
    pub fn from_description(description: &str) -> Self {
        let desc = description.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| desc.contains(n));

        if has(&["rain", "shower"]) {
            WeatherIcon::Rain
        } else if has(&["cloud", "overcast"]) {
            WeatherIcon::Cloud
        } else if has(&["thunder", "storm"]) {
            WeatherIcon::Storm
        } else if has(&["sun", "fair", "clear"]) {
            WeatherIcon::Sun
        } else {
            WeatherIcon::Cloud
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherIcon::Sun => "sun",
            WeatherIcon::Cloud => "cloud",
            WeatherIcon::Rain => "rain",
            WeatherIcon::Storm => "storm",
        }
    }
}

/// How favorable conditions are for an outdoor beach cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suitability {
    Perfect,
    Good,
    Okay,
    Poor,
}

impl Suitability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suitability::Perfect => "perfect",
            Suitability::Good => "good",
            Suitability::Okay => "okay",
            Suitability::Poor => "poor",
        }
    }

    /// Short headline shown next to the temperature.
    pub fn label(&self) -> &'static str {
        match self {
            Suitability::Perfect => "Perfect for cleanup!",
            Suitability::Good => "Great for cleanup!",
            Suitability::Okay => "Okay conditions",
            Suitability::Poor => "Check conditions",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Suitability::Perfect => "Perfect for beach cleanup!",
            Suitability::Good => "Great conditions for cleanup!",
            Suitability::Okay => "Okay conditions - bring sun protection!",
            Suitability::Poor => "Not ideal - check back later!",
        }
    }
}

impl std::fmt::Display for Suitability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable, fully-populated weather record for a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: f64,
    pub uv_index: f64,
    pub description: String,
    pub icon: WeatherIcon,
    pub suitability: Suitability,
    pub forecast: Vec<ForecastDay>,
    pub is_fallback: bool,
    pub captured_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Time elapsed since the snapshot was captured.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.captured_at
    }
}

/// Where the user is planning a cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            name: "Pasir Ris Beach".to_string(),
            lat: 1.381497,
            lng: 103.955574,
        }
    }
}
