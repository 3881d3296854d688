//! Core library for the `shoresquad` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - The upstream endpoint client and concurrent batch fetch
//! - Reconciliation of station readings and forecast normalization
//! - Snapshot building with fallback values and cleanup suitability
//! - The cache gate, the single current-snapshot slot and trigger dispatch
//!
//! It is used by `shoresquad-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod config;
pub mod forecast;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod reconcile;
pub mod slot;
pub mod snapshot;

pub use cache::{CacheDecision, CacheGate, CacheRecord, CacheStore};
pub use config::Config;
pub use model::{ForecastDay, Location, Parameter, StationReading, Suitability, WeatherIcon, WeatherSnapshot};
pub use pipeline::{DispatchOutcome, PipelineContext, RefreshPolicy, Trigger, WeatherService};
pub use provider::{Endpoint, FetchBatch, FetchError, NeaClient, ReadingSource};
pub use slot::{RefreshTicket, SnapshotSlot};
