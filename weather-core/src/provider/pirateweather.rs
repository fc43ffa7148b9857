use chrono_tz::Tz;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{ApiError, Error, Result},
    model::{LatLon, Location, WeatherCode, WeatherConditions, WeatherResponse, make_wind},
    units::{Direction, Distance, Precipitation, SpeedUnit, Temperature},
};

use super::{
    ProviderId, WeatherProvider, decode, error_message, local_time, parse_url, require_coordinates,
};

const NAME: &str = "Pirate Weather";
const DEFAULT_BASE_URL: &str = "https://api.pirateweather.net/forecast";

/// Pirate Weather, a Dark Sky compatible API. Coordinates only.
#[derive(Debug, Clone)]
pub struct PirateWeatherProvider {
    api_key: String,
    base_url: String,
}

impl PirateWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        parse_url(base_url)?;
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct PwResponse {
    timezone: String,
    currently: PwDataPoint,
    daily: Option<PwDaily>,
}

#[derive(Debug, Deserialize)]
struct PwDaily {
    #[serde(default)]
    data: Vec<PwDataPoint>,
}

/// Imperial units (`units=us`); fractions are 0-1.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PwDataPoint {
    time: i64,
    summary: Option<String>,
    icon: Option<String>,
    temperature: Option<f64>,
    apparent_temperature: Option<f64>,
    dew_point: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    precip_intensity: Option<f64>,
    precip_probability: Option<f64>,
    cloud_cover: Option<f64>,
    wind_speed: Option<f64>,
    wind_gust: Option<f64>,
    wind_bearing: Option<f64>,
    uv_index: Option<f64>,
    visibility: Option<f64>,
    sunrise_time: Option<i64>,
    sunset_time: Option<i64>,
    temperature_low: Option<f64>,
    temperature_high: Option<f64>,
    apparent_temperature_low: Option<f64>,
    apparent_temperature_high: Option<f64>,
}

fn percent(fraction: Option<f64>) -> Option<f64> {
    fraction.map(|f| f * 100.0)
}

fn fahrenheit(value: Option<f64>) -> Option<Temperature> {
    value.map(Temperature::fahrenheit)
}

fn map_data_point(tz: &Tz, data: PwDataPoint) -> Result<WeatherConditions> {
    let sunrise = data.sunrise_time.map(|t| local_time(NAME, tz, t)).transpose()?;
    let sunset = data.sunset_time.map(|t| local_time(NAME, tz, t)).transpose()?;

    Ok(WeatherConditions {
        summary: data.summary,
        // icons come as names only, without a URL to show them
        weather_code: data.icon.map(WeatherCode::Named),
        icon: None,
        temperature: fahrenheit(data.temperature),
        feels_like: fahrenheit(data.apparent_temperature),
        dew_point: fahrenheit(data.dew_point),
        humidity: percent(data.humidity),
        pressure: data.pressure,
        precipitation: Precipitation::optional(
            percent(data.precip_probability),
            None,
            data.precip_intensity,
        )?,
        cloud_cover: percent(data.cloud_cover),
        wind: make_wind(
            Direction::optional(data.wind_bearing),
            data.wind_speed,
            data.wind_gust,
            SpeedUnit::Mph,
        ),
        uv_index: data.uv_index,
        visibility: data.visibility.map(Distance::miles),
        sunrise,
        sunset,
        low_temperature: fahrenheit(data.temperature_low),
        high_temperature: fahrenheit(data.temperature_high),
        low_feels_like: fahrenheit(data.apparent_temperature_low),
        high_feels_like: fahrenheit(data.apparent_temperature_high),
        ..WeatherConditions::at(local_time(NAME, tz, data.time)?)
    })
}

impl WeatherProvider for PirateWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::PirateWeather
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request_url(&self, location: &Location, forecast_days: u32) -> Result<Url> {
        let LatLon { lat, lon } = require_coordinates(NAME, location)?;

        let mut exclude = vec!["minutely", "hourly", "alerts"];
        if forecast_days == 0 {
            exclude.push("daily");
        }

        let mut url = parse_url(&format!("{}/{}/{lat},{lon}", self.base_url, self.api_key))?;
        url.query_pairs_mut()
            .append_pair("units", "us")
            .append_pair("exclude", &exclude.join(","));
        Ok(url)
    }

    fn map_response(&self, location: &Location, data: Value) -> Result<WeatherResponse> {
        if let Some(message) = error_message(&data, "message") {
            return Err(ApiError::Upstream(message).into());
        }

        let LatLon { lat, lon } = require_coordinates(NAME, location)?;
        let parsed: PwResponse = decode(NAME, data)?;
        let tz: Tz = parsed
            .timezone
            .parse()
            .map_err(|_| Error::InvalidTimezone(parsed.timezone.clone()))?;

        let current = map_data_point(&tz, parsed.currently)?;
        let daily_forecast = parsed
            .daily
            .map(|daily| daily.data)
            .unwrap_or_default()
            .into_iter()
            .map(|day| map_data_point(&tz, day))
            .collect::<Result<Vec<_>>>()?;

        Ok(WeatherResponse::new(
            NAME,
            format!("https://merrysky.net/forecast/{lat},{lon}"),
            current,
            daily_forecast,
        ))
    }
}
