use anyhow::{Context, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Text};
use shoresquad_core::{Config, DispatchOutcome, Location, Trigger, WeatherService};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "shoresquad", version, about = "Beach weather for cleanup crews")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure API base, location and cache thresholds interactively.
    Configure,

    /// Show current conditions, reusing recent cached data.
    Show {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Fetch fresh conditions regardless of the cache.
    Refresh {
        #[arg(long)]
        json: bool,
    },

    /// Show the day-by-day forecast.
    Forecast,

    /// Run the pipeline for a named trigger, e.g. "connectivity-restored".
    Trigger {
        name: String,

        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { json } => dispatch(Trigger::PageLoad, json).await,
            Command::Refresh { json } => dispatch(Trigger::ManualRefresh, json).await,
            Command::Forecast => {
                let (service, outcome) = run_trigger(Trigger::PageLoad).await?;
                let snapshot = outcome
                    .snapshot()
                    .ok_or_else(|| anyhow!("No weather available"))?;
                print!("{}", render::forecast(snapshot, service.location()));
                Ok(())
            }
            Command::Trigger { name, json } => {
                let trigger = Trigger::try_from(name.as_str())?;
                dispatch(trigger, json).await
            }
        }
    }
}

async fn run_trigger(trigger: Trigger) -> anyhow::Result<(WeatherService, DispatchOutcome)> {
    let config = Config::load()?;
    let service = WeatherService::from_config(&config)?;
    let outcome = service.dispatch(trigger, Utc::now()).await;
    tracing::debug!(%trigger, outcome = outcome.kind(), "trigger handled");
    Ok((service, outcome))
}

async fn dispatch(trigger: Trigger, json: bool) -> anyhow::Result<()> {
    let (service, outcome) = run_trigger(trigger).await?;

    let snapshot = match &outcome {
        DispatchOutcome::Superseded => {
            println!("A newer refresh replaced this one; nothing to show.");
            return Ok(());
        }
        other => other.snapshot().ok_or_else(|| anyhow!("No weather available"))?,
    };

    if json {
        let out = serde_json::to_string_pretty(snapshot.as_ref())
            .context("Failed to serialize snapshot")?;
        println!("{out}");
    } else {
        let cached = matches!(outcome, DispatchOutcome::Reused(_));
        print!("{}", render::summary(snapshot, service.location(), cached, Utc::now()));
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.api_base = Text::new("API base URL:")
        .with_default(&config.api_base)
        .prompt()?;

    let name = Text::new("Beach name:")
        .with_default(&config.location.name)
        .prompt()?;
    let lat = CustomType::<f64>::new("Latitude:")
        .with_default(config.location.lat)
        .with_error_message("Please type a number")
        .prompt()?;
    let lng = CustomType::<f64>::new("Longitude:")
        .with_default(config.location.lng)
        .with_error_message("Please type a number")
        .prompt()?;
    config.location = Location { name, lat, lng };

    config.request_timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.request_timeout_secs)
        .prompt()?;
    config.cache_max_age_secs = CustomType::<u64>::new("Cache max age (seconds):")
        .with_default(config.cache_max_age_secs)
        .prompt()?;
    config.weather_refresh_interval_secs = CustomType::<u64>::new("Weather refresh interval (seconds):")
        .with_default(config.weather_refresh_interval_secs)
        .prompt()?;

    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
