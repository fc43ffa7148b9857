use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, Password, PasswordDisplayMode, Text};
use multiweather::{
    Config, Location, WeatherProvider, WeatherResponse, default_provider_from_config,
    get_backend_by_name, provider_from_config, transport::DEFAULT_TIMEOUT,
};
use tracing::{debug, info};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "multiweather", version, about = "Weather from several providers, in one shape")]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name, e.g. "openweathermap" or "pirateweather".
        provider: String,
    },

    /// Show current weather, and optionally a daily forecast.
    Show {
        /// "lat,lon" or a place name.
        location: String,

        /// Number of forecast days to include.
        #[arg(long, default_value_t = 0)]
        days: u32,

        /// Provider to use instead of the configured default.
        #[arg(long)]
        provider: Option<String>,

        /// Use the blocking HTTP client.
        #[arg(long)]
        sync: bool,

        /// Request timeout in seconds for --sync.
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },

    /// List supported providers and whether they are configured.
    Providers,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show {
                location,
                days,
                provider,
                sync,
                timeout,
            } => {
                let config = Config::load()?;
                let provider = match provider {
                    Some(name) => provider_from_config(get_backend_by_name(&name)?, &config)?,
                    None => default_provider_from_config(&config)?,
                };
                let location = Location::parse(&location);
                let timeout = timeout.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);

                let response = fetch(provider, location, days, sync, timeout).await?;
                print!("{}", output::render(&response));
                Ok(())
            }
            Command::Providers => {
                let config = Config::load()?;
                let default = config.default_provider_id()?;
                print!("{}", output::render_providers(&config, default));
                Ok(())
            }
        }
    }
}

async fn fetch(
    provider: Box<dyn WeatherProvider>,
    location: Location,
    days: u32,
    sync: bool,
    timeout: Duration,
) -> anyhow::Result<WeatherResponse> {
    info!(provider = provider.name(), %location, days, sync, "fetching weather");

    let response = if sync {
        // the blocking client refuses to run on a runtime thread
        tokio::task::spawn_blocking(move || provider.get_weather_sync(&location, timeout, days))
            .await
            .context("blocking weather request panicked")??
    } else {
        provider.get_weather(&location, days).await?
    };

    debug!(forecast_days = response.daily_forecast.len(), "weather received");
    Ok(response)
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = get_backend_by_name(provider)?;
    let mut config = Config::load()?;

    let api_key = if id.requires_api_key() {
        let key = Password::new(&format!("API key for {id}:"))
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()?;
        if key.trim().is_empty() {
            bail!("An API key is required for provider '{id}'");
        }
        Some(key)
    } else {
        let key = Text::new(&format!("Customer API key for {id} (leave empty for the free tier):"))
            .prompt()?;
        Some(key).filter(|k| !k.trim().is_empty())
    };

    if let Some(key) = api_key {
        config.upsert_provider_api_key(id, key.trim().to_string());
    }

    if config.default_provider_id()? != id {
        let make_default = Confirm::new(&format!("Make {id} the default provider?"))
            .with_default(true)
            .prompt()?;
        if make_default {
            config.set_default_provider(id);
        }
    }

    config.save()?;
    println!(
        "Saved configuration for '{id}' to {}",
        Config::config_file_path()?.display()
    );
    Ok(())
}
