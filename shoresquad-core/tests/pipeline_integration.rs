//! Integration tests for the weather pipeline against a mock upstream.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use shoresquad_core::{
    CacheRecord, CacheStore, Config, DispatchOutcome, Endpoint, FetchError, Location, NeaClient,
    ReadingSource, Suitability, Trigger, WeatherIcon, WeatherService, pipeline, snapshot,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration as StdDuration,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREFIX: &str = "/v1/environment";

fn station(value: f64) -> Value {
    json!({
        "metadata": { "stations": [{ "id": "S106", "name": "Pulau Ubin" }] },
        "items": [{
            "timestamp": "2025-12-01T10:00:00+08:00",
            "readings": [{ "station_id": "S106", "value": value }, { "station_id": "S24", "value": 99.0 }]
        }],
        "api_info": { "status": "healthy" }
    })
}

fn payload_for(endpoint: Endpoint) -> Value {
    match endpoint {
        Endpoint::AirTemperature => station(27.5),
        Endpoint::RelativeHumidity => station(78.0),
        Endpoint::WindSpeed => station(10.0),
        Endpoint::WindDirection => station(35.0),
        Endpoint::UvIndex => json!({ "items": [{ "index": [{ "value": 5, "timestamp": "2025-12-01T10:00:00+08:00" }] }] }),
        Endpoint::ShortRangeForecast => json!({
            "items": [{
                "valid_period": { "start": "2025-12-01T06:00:00+08:00", "end": "2025-12-02T06:00:00+08:00" },
                "general": {
                    "forecast": "Partly Cloudy (Day)",
                    "relative_humidity": { "low": 60, "high": 90 },
                    "temperature": { "low": 25, "high": 33 }
                }
            }]
        }),
        Endpoint::MultiDayForecast => json!({
            "items": [{ "forecasts": [
                { "date": "2025-12-02", "forecast": "Thundery Showers", "temperature": { "low": 24, "high": 31 } },
                { "date": "2025-12-03", "forecast": "Fair", "temperature": { "low": 25, "high": 32 } },
                { "date": "2025-12-04", "forecast": "Cloudy", "temperature": { "low": 25, "high": 32 } },
                { "date": "2025-12-05", "forecast": "Fair", "temperature": { "low": 26, "high": 33 } }
            ] }]
        }),
    }
}

async fn mount(server: &MockServer, endpoint: Endpoint, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("{PREFIX}/{}", endpoint.as_str())))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_all_except(server: &MockServer, skip: &[Endpoint]) {
    for &endpoint in Endpoint::all() {
        if !skip.contains(&endpoint) {
            mount(server, endpoint, ResponseTemplate::new(200).set_body_json(payload_for(endpoint))).await;
        }
    }
}

fn config_for(server: &MockServer, dir: &tempfile::TempDir) -> Config {
    Config {
        api_base: format!("{}{PREFIX}", server.uri()),
        request_timeout_secs: 2,
        cache_path: Some(dir.path().join("cache.json")),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_live_refresh_builds_and_persists_snapshot() {
    let server = MockServer::start().await;
    mount_all_except(&server, &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, &dir);

    let service = WeatherService::from_config(&config).unwrap();
    let now = Utc::now();
    let outcome = service.dispatch(Trigger::ManualRefresh, now).await;

    let snapshot = outcome.snapshot().expect("refreshed snapshot").clone();
    assert!(matches!(outcome, DispatchOutcome::Refreshed(_)));
    assert!(!snapshot.is_fallback);
    assert_eq!(snapshot.temperature, 27.5);
    assert_eq!(snapshot.feels_like, 29.5);
    assert_eq!(snapshot.humidity, 78.0);
    assert_eq!(snapshot.wind_speed_kmh, 18.5);
    assert_eq!(snapshot.wind_direction_deg, 35.0);
    assert_eq!(snapshot.uv_index, 5.0);
    assert_eq!(snapshot.description, "Partly Cloudy (Day)");
    assert_eq!(snapshot.icon, WeatherIcon::Cloud);
    assert_eq!(snapshot.suitability, Suitability::Perfect);
    assert_eq!(snapshot.forecast.len(), 5);
    assert_eq!(snapshot.forecast[1].short_description, "Thundery Showers");

    let record = CacheStore::new(dir.path().join("cache.json")).load().expect("persisted record");
    assert_eq!(record.timestamp, now.timestamp_millis());
    assert_eq!(record.weather.as_ref(), Some(snapshot.as_ref()));
    assert_eq!(record.location, Some(Location::default()));
}

#[tokio::test]
async fn test_partial_failures_fall_back_per_field() {
    let server = MockServer::start().await;
    mount_all_except(&server, &[Endpoint::RelativeHumidity, Endpoint::WindSpeed, Endpoint::ShortRangeForecast]).await;
    mount(&server, Endpoint::RelativeHumidity, ResponseTemplate::new(500).set_body_string("upstream down")).await;
    mount(&server, Endpoint::WindSpeed, ResponseTemplate::new(200).set_body_string("<html>maintenance</html>")).await;
    // 24-hour forecast is left unmounted: wiremock answers 404
    let dir = tempfile::tempdir().unwrap();

    let service = WeatherService::from_config(&config_for(&server, &dir)).unwrap();
    let outcome = service.dispatch(Trigger::ConnectivityRestored, Utc::now()).await;
    let snapshot = outcome.snapshot().expect("snapshot");

    assert!(snapshot.is_fallback);
    assert_eq!(snapshot.temperature, 27.5);
    assert_eq!(snapshot.humidity, snapshot::FALLBACK_HUMIDITY);
    assert_eq!(snapshot.wind_speed_kmh, snapshot::FALLBACK_WIND_SPEED_KMH);
    assert_eq!(snapshot.description, snapshot::FALLBACK_DESCRIPTION);
    assert_eq!(snapshot.uv_index, 5.0);
    // today is missing, the 4-day entries remain
    assert_eq!(snapshot.forecast.len(), 4);
    // temperature 27.5 with no wind or description reading
    assert_eq!(snapshot.suitability, Suitability::Perfect);
}

#[tokio::test]
async fn test_timeout_only_affects_its_endpoint() {
    let server = MockServer::start().await;
    mount_all_except(&server, &[Endpoint::UvIndex]).await;
    mount(
        &server,
        Endpoint::UvIndex,
        ResponseTemplate::new(200)
            .set_body_json(payload_for(Endpoint::UvIndex))
            .set_delay(StdDuration::from_secs(3)),
    )
    .await;

    let client = NeaClient::new(format!("{}{PREFIX}", server.uri()), StdDuration::from_millis(300)).unwrap();

    let err = client.fetch(Endpoint::UvIndex).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { endpoint: Endpoint::UvIndex }), "{err}");

    let ctx = pipeline::PipelineContext::new(Location::default(), Utc::now());
    let snapshot = pipeline::run(&client, &ctx).await;
    assert!(snapshot.is_fallback);
    assert_eq!(snapshot.uv_index, snapshot::FALLBACK_UV_INDEX);
    assert_eq!(snapshot.temperature, 27.5);
}

#[tokio::test]
async fn test_total_failure_yields_fallback_snapshot() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let service = WeatherService::from_config(&config_for(&server, &dir)).unwrap();
    let now = Utc::now();
    let outcome = service.dispatch(Trigger::ManualRefresh, now).await;

    let snapshot = outcome.snapshot().expect("snapshot");
    assert_eq!(snapshot.as_ref(), &snapshot::fallback_snapshot(now));
    assert!(snapshot.is_fallback);
    assert_eq!(snapshot.suitability, Suitability::Good);
}

#[tokio::test]
async fn test_page_load_reuses_fresh_cache_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, &dir);

    let now = Utc::now();
    let stored_at = now - Duration::minutes(30);
    let cached = snapshot::fallback_snapshot(stored_at);
    CacheStore::new(config.cache_file_path().unwrap())
        .save(&CacheRecord {
            events: vec![json!({ "id": 1, "title": "Pasir Ris Beach Cleanup" })],
            location: Some(Location::default()),
            weather: Some(cached.clone()),
            timestamp: stored_at.timestamp_millis(),
        })
        .unwrap();

    let service = WeatherService::from_config(&config).unwrap();
    let outcome = service.dispatch(Trigger::PageLoad, now).await;

    assert!(matches!(outcome, DispatchOutcome::Reused(_)));
    assert_eq!(outcome.snapshot().map(|s| s.as_ref()), Some(&cached));
}

#[tokio::test]
async fn test_page_load_refreshes_stale_cache() {
    let server = MockServer::start().await;
    mount_all_except(&server, &[]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server, &dir);

    let now = Utc::now();
    let stored_at = now - Duration::minutes(61);
    let store = CacheStore::new(config.cache_file_path().unwrap());
    store
        .save(&CacheRecord {
            events: vec![json!({ "id": 7 })],
            location: Some(Location::default()),
            weather: Some(snapshot::fallback_snapshot(stored_at)),
            timestamp: stored_at.timestamp_millis(),
        })
        .unwrap();

    let service = WeatherService::from_config(&config).unwrap();
    let outcome = service.dispatch(Trigger::PageLoad, now).await;

    assert!(matches!(outcome, DispatchOutcome::Refreshed(_)));
    let record = store.load().expect("record");
    assert_eq!(record.timestamp, now.timestamp_millis());
    assert_eq!(record.events, vec![json!({ "id": 7 })]);
    assert!(!record.weather.expect("weather").is_fallback);
}

/// First batch of requests is slow and reports 25°C; later ones are instant and report 31°C.
#[derive(Debug, Default)]
struct ReorderingSource {
    calls: AtomicUsize,
}

#[async_trait]
impl ReadingSource for ReorderingSource {
    async fn fetch(&self, endpoint: Endpoint) -> Result<Value, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let first_batch = call < Endpoint::all().len();
        if first_batch {
            tokio::time::sleep(StdDuration::from_millis(150)).await;
        }
        match endpoint {
            Endpoint::AirTemperature => Ok(station(if first_batch { 25.0 } else { 31.0 })),
            other => Ok(payload_for(other)),
        }
    }
}

#[tokio::test]
async fn test_superseded_refresh_does_not_overwrite_newer_snapshot() {
    let service = WeatherService::new(&Config::default(), Arc::new(ReorderingSource::default()), None);
    let now = Utc::now();

    let (a, b) = tokio::join!(service.refresh(now), service.refresh(now));

    assert_eq!(a, DispatchOutcome::Superseded);
    assert!(matches!(b, DispatchOutcome::Refreshed(_)));
    assert_eq!(service.current().map(|s| s.temperature), Some(31.0));
}
