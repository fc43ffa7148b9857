//! Core library for the `multiweather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Unit-normalized value types (temperature, distance, speed, ...)
//! - Abstraction over weather providers (Open-Meteo, OpenWeatherMap, Pirate Weather)
//! - Shared domain models (current conditions, daily forecasts)
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod transport;
pub mod units;
pub mod wmo;

pub use config::{Config, ProviderConfig};
pub use error::{ApiError, Error, Result, ValidationError};
pub use model::{LatLon, Location, WeatherCode, WeatherConditions, WeatherResponse, WindConditions};
pub use provider::{
    ProviderId, WeatherProvider, default_provider_from_config, get_backend_by_name,
    provider_from_config,
};
pub use transport::{AsyncTransport, BlockingTransport, Transport};
pub use units::{Direction, Distance, Precipitation, Speed, SpeedUnit, Temperature, UnitValue};
