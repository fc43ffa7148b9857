use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use crate::units::{Direction, Distance, Precipitation, Speed, SpeedUnit, Temperature};

/// Latitude / longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<(f64, f64)> for LatLon {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Where to fetch weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Coordinates(LatLon),
    /// Free-text place name; only adapters with geocoding accept it.
    Place(String),
}

impl Location {
    pub fn coordinates(&self) -> Option<LatLon> {
        match self {
            Location::Coordinates(c) => Some(*c),
            Location::Place(_) => None,
        }
    }

    /// Parses `"lat,lon"` into coordinates and treats anything else as a place name.
    pub fn parse(input: &str) -> Self {
        let parsed = input.split_once(',').and_then(|(lat, lon)| {
            let lat = lat.trim().parse::<f64>().ok()?;
            let lon = lon.trim().parse::<f64>().ok()?;
            ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon))
                .then_some(LatLon { lat, lon })
        });

        match parsed {
            Some(c) => Location::Coordinates(c),
            None => Location::Place(input.trim().to_string()),
        }
    }
}

impl From<(f64, f64)> for Location {
    fn from(pair: (f64, f64)) -> Self {
        Location::Coordinates(pair.into())
    }
}

impl From<LatLon> for Location {
    fn from(c: LatLon) -> Self {
        Location::Coordinates(c)
    }
}

impl From<&str> for Location {
    fn from(name: &str) -> Self {
        Location::Place(name.to_string())
    }
}

impl From<String> for Location {
    fn from(name: String) -> Self {
        Location::Place(name)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Coordinates(c) => c.fmt(f),
            Location::Place(name) => f.write_str(name),
        }
    }
}

/// Provider-specific condition code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WeatherCode {
    /// WMO code (Open-Meteo) or condition id (OpenWeatherMap).
    Numeric(i64),
    /// Icon name (Dark Sky compatible APIs).
    Named(String),
}

impl fmt::Display for WeatherCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherCode::Numeric(code) => write!(f, "{code}"),
            WeatherCode::Named(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindConditions {
    pub speed: Speed,
    pub gust: Option<Speed>,
    pub direction: Direction,
}

/// Builds wind conditions when both a direction and a speed are known.
///
/// `gust` is interpreted in the same unit as `speed`.
pub fn make_wind(
    direction: Option<Direction>,
    speed: Option<f64>,
    gust: Option<f64>,
    unit: SpeedUnit,
) -> Option<WindConditions> {
    let direction = direction?;
    let speed = speed?;

    Some(WindConditions {
        speed: Speed::from_unit(speed, unit),
        gust: gust.map(|g| Speed::from_unit(g, unit)),
        direction,
    })
}

/// Conditions at one point in time, or over one forecast day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherConditions {
    pub summary: Option<String>,
    pub weather_code: Option<WeatherCode>,
    pub icon: Option<String>,
    pub time: DateTime<FixedOffset>,

    pub temperature: Option<Temperature>,
    pub feels_like: Option<Temperature>,
    pub dew_point: Option<Temperature>,
    /// Relative humidity, 0-100.
    pub humidity: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    pub precipitation: Option<Precipitation>,
    /// 0-100
    pub cloud_cover: Option<f64>,
    pub wind: Option<WindConditions>,
    pub uv_index: Option<f64>,
    pub visibility: Option<Distance>,

    // Forecast fields
    pub sunrise: Option<DateTime<FixedOffset>>,
    pub sunset: Option<DateTime<FixedOffset>>,
    pub low_temperature: Option<Temperature>,
    pub high_temperature: Option<Temperature>,
    pub low_feels_like: Option<Temperature>,
    pub high_feels_like: Option<Temperature>,
}

impl WeatherConditions {
    /// A record at `time` with every measurement unset.
    pub fn at(time: DateTime<FixedOffset>) -> Self {
        Self {
            summary: None,
            weather_code: None,
            icon: None,
            time,
            temperature: None,
            feels_like: None,
            dew_point: None,
            humidity: None,
            pressure: None,
            precipitation: None,
            cloud_cover: None,
            wind: None,
            uv_index: None,
            visibility: None,
            sunrise: None,
            sunset: None,
            low_temperature: None,
            high_temperature: None,
            low_feels_like: None,
            high_feels_like: None,
        }
    }
}

/// Normalized result of one weather lookup.
///
/// Timestamps are `DateTime<FixedOffset>`, so every record is timezone-aware
/// by construction and expressed in the location's local offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherResponse {
    pub current: WeatherConditions,
    /// Provider display name.
    pub name: String,
    /// Attribution link for the provider / location.
    pub url: String,
    /// Oldest first; empty when no forecast was requested or supported.
    pub daily_forecast: Vec<WeatherConditions>,
}

impl WeatherResponse {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        current: WeatherConditions,
        daily_forecast: Vec<WeatherConditions>,
    ) -> Self {
        Self {
            current,
            name: name.into(),
            url: url.into(),
            daily_forecast,
        }
    }
}
