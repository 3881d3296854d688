use chrono::{DateTime, Utc};
use shoresquad_core::{Location, WeatherSnapshot, snapshot::format_kmh};
use std::fmt::Write;

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn data_source(snapshot: &WeatherSnapshot) -> &'static str {
    if snapshot.is_fallback { "(Offline)" } else { "(NEA Live Data)" }
}

fn age(snapshot: &WeatherSnapshot, now: DateTime<Utc>) -> String {
    let minutes = snapshot.age(now).num_minutes().max(0);
    match minutes {
        0 => "just now".to_string(),
        1..=59 => format!("{minutes} min ago"),
        _ => format!("{} h {} min ago", minutes / 60, minutes % 60),
    }
}

/// Current conditions block.
pub fn summary(
    snapshot: &WeatherSnapshot,
    location: &Location,
    cached: bool,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", location.name, data_source(snapshot));

    let _ = writeln!(
        out,
        "  {} [{}]",
        capitalize(&snapshot.description),
        snapshot.icon.as_str()
    );
    let _ = writeln!(
        out,
        "  Temperature  {:.0}°C (feels like {:.0}°C)",
        snapshot.temperature, snapshot.feels_like
    );
    let _ = writeln!(out, "  Humidity     {:.0}%", snapshot.humidity);
    let _ = writeln!(
        out,
        "  Wind         {} km/h from {:.0}°",
        format_kmh(snapshot.wind_speed_kmh),
        snapshot.wind_direction_deg
    );
    let _ = writeln!(out, "  UV index     {}", snapshot.uv_index);
    let _ = writeln!(
        out,
        "  {} {}",
        snapshot.suitability.label(),
        snapshot.suitability.recommendation()
    );
    let _ = writeln!(
        out,
        "  Updated {}{}",
        age(snapshot, now),
        if cached { " (cached)" } else { "" }
    );
    out
}

pub fn forecast(snapshot: &WeatherSnapshot, location: &Location) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Forecast for {} {}", location.name, data_source(snapshot));

    if snapshot.forecast.is_empty() {
        let _ = writeln!(out, "  No forecast available.");
        return out;
    }

    for (i, day) in snapshot.forecast.iter().enumerate() {
        let label = if i == 0 {
            "Today".to_string()
        } else {
            day.date.format("%a %d %b").to_string()
        };
        let _ = writeln!(
            out,
            "  {label:<10} {:>3.0}° / {:>3.0}°  {}",
            day.temperature_high, day.temperature_low, day.short_description
        );
    }
    out
}
