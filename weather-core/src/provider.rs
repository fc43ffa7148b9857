use crate::{
    Config, ProviderConfig,
    error::{Error, Result},
    model::{LatLon, Location, WeatherResponse},
    provider::{
        openmeteo::OpenMeteoProvider, openweathermap::OpenWeatherMapProvider,
        pirateweather::PirateWeatherProvider,
    },
    transport::{AsyncTransport, BlockingTransport, Transport},
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{fmt::Debug, str::FromStr, time::Duration};
use tracing::debug;

pub mod openmeteo;
pub mod openweathermap;
pub mod pirateweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
    OpenWeatherMap,
    PirateWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "openmeteo",
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::PirateWeather => "pirateweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::OpenMeteo,
            ProviderId::OpenWeatherMap,
            ProviderId::PirateWeather,
        ]
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderId::OpenMeteo)
    }

    /// Environment variable that overrides the configured API key.
    pub fn api_key_env_var(&self) -> String {
        format!("API_KEY_{}", self.as_str().to_uppercase())
    }

    /// Instantiate the adapter for this id from its settings.
    pub fn build(&self, settings: &ProviderConfig) -> Result<Box<dyn WeatherProvider>> {
        let api_key = settings.api_key.clone().filter(|k| !k.trim().is_empty());

        let boxed: Box<dyn WeatherProvider> = match self {
            ProviderId::OpenMeteo => {
                let mut provider = OpenMeteoProvider::new(api_key)?;
                if let Some(fill) = settings.fill_current_with_hourly {
                    provider = provider.fill_current_with_hourly(fill);
                }
                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url)?;
                }
                Box::new(provider)
            }
            ProviderId::OpenWeatherMap => {
                let api_key = api_key.ok_or(Error::MissingApiKey(*self))?;
                let mut provider = OpenWeatherMapProvider::new(api_key);
                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url)?;
                }
                Box::new(provider)
            }
            ProviderId::PirateWeather => {
                let api_key = api_key.ok_or(Error::MissingApiKey(*self))?;
                let mut provider = PirateWeatherProvider::new(api_key);
                if let Some(base_url) = &settings.base_url {
                    provider = provider.with_base_url(base_url)?;
                }
                Box::new(provider)
            }
        };

        Ok(boxed)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        ProviderId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == lower)
            .ok_or_else(|| Error::UnknownBackend {
                name: value.to_string(),
                valid: ProviderId::all().iter().map(ProviderId::as_str).collect(),
            })
    }
}

impl FromStr for ProviderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProviderId::try_from(s)
    }
}

/// Registry lookup by backend name.
pub fn get_backend_by_name(name: &str) -> Result<ProviderId> {
    ProviderId::try_from(name)
}

/// A weather API integration.
///
/// Implementors only describe URLs and JSON mapping; the request pipeline
/// (`get_weather*`) is shared.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// Display name reported in [`WeatherResponse::name`].
    fn name(&self) -> &'static str;

    /// URL for current conditions plus `forecast_days` days of daily forecast.
    fn build_request_url(&self, location: &Location, forecast_days: u32) -> Result<Url>;

    /// Map the provider's JSON into the normalized records.
    fn map_response(&self, location: &Location, data: Value) -> Result<WeatherResponse>;

    /// `Ok(None)` if the weather endpoint accepts place names directly,
    /// `Ok(Some(url))` if a separate lookup is needed.
    fn geocode_url(&self, _place: &str) -> Result<Option<Url>> {
        Err(Error::not_supported(self.name(), "geocoding"))
    }

    fn parse_geocode(&self, _place: &str, _data: Value) -> Result<LatLon> {
        Err(Error::not_supported(self.name(), "geocoding"))
    }

    /// Run the request pipeline over a caller-supplied transport.
    async fn get_weather_with(
        &self,
        transport: &dyn Transport,
        location: &Location,
        forecast_days: u32,
    ) -> Result<WeatherResponse> {
        fetch_weather(self, transport, location, forecast_days).await
    }

    async fn get_weather(
        &self,
        location: &Location,
        forecast_days: u32,
    ) -> Result<WeatherResponse> {
        let transport = AsyncTransport::new()?;
        self.get_weather_with(&transport, location, forecast_days).await
    }

    /// Blocking variant of [`WeatherProvider::get_weather`].
    ///
    /// # Panics
    ///
    /// Panics when called on a thread that is driving an async runtime, as
    /// `reqwest::blocking` does. From async code use `get_weather`, or run this
    /// inside `tokio::task::spawn_blocking`.
    fn get_weather_sync(
        &self,
        location: &Location,
        timeout: Duration,
        forecast_days: u32,
    ) -> Result<WeatherResponse> {
        let transport = BlockingTransport::new(timeout)?;
        futures::executor::block_on(self.get_weather_with(&transport, location, forecast_days))
    }
}

/// Resolve the location (at most one geocode call), then one weather call.
async fn fetch_weather<P>(
    provider: &P,
    transport: &dyn Transport,
    location: &Location,
    forecast_days: u32,
) -> Result<WeatherResponse>
where
    P: WeatherProvider + ?Sized,
{
    let resolved = match location {
        Location::Place(place) => match provider.geocode_url(place)? {
            Some(url) => {
                debug!(provider = provider.name(), %place, "resolving place name");
                let data = transport.fetch_json(&url).await?;
                Location::Coordinates(provider.parse_geocode(place, data)?)
            }
            None => location.clone(),
        },
        Location::Coordinates(_) => location.clone(),
    };

    let url = provider.build_request_url(&resolved, forecast_days)?;
    debug!(provider = provider.name(), location = %resolved, forecast_days, "requesting weather");

    let data = transport.fetch_json(&url).await?;
    provider.map_response(&resolved, data)
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let settings = config.resolved_provider_config(id);

    if id.requires_api_key() && settings.api_key.is_none() {
        return Err(anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `multiweather configure {id}` and enter your API key."
        ));
    }

    Ok(id.build(&settings)?)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}

// Helpers shared by the adapters.

pub(crate) fn require_coordinates(provider: &'static str, location: &Location) -> Result<LatLon> {
    location
        .coordinates()
        .ok_or_else(|| Error::not_supported(provider, "weather lookup by place name"))
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn decode<T: DeserializeOwned>(provider: &'static str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| Error::malformed(provider, e.to_string()))
}

/// Unix timestamp in the location's timezone, keeping that zone's offset.
pub(crate) fn local_time<Z: TimeZone>(
    provider: &'static str,
    tz: &Z,
    ts: i64,
) -> Result<DateTime<FixedOffset>> {
    tz.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| Error::malformed(provider, format!("timestamp {ts} out of range")))
}

/// String field of an error payload, if present.
pub(crate) fn error_message(data: &Value, field: &str) -> Option<String> {
    data.get(field).map(|v| match v.as_str() {
        Some(s) => s.to_string(),
        None => v.to_string(),
    })
}
