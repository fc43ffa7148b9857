use chrono_tz::Tz;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{ApiError, Error, Result},
    model::{LatLon, Location, WeatherCode, WeatherConditions, WeatherResponse, make_wind},
    units::{Direction, Distance, Precipitation, SpeedUnit, Temperature},
    wmo::WmoCodeTable,
};

use super::{
    ProviderId, WeatherProvider, decode, error_message, local_time, parse_url, require_coordinates,
};

const NAME: &str = "Open-Meteo.com";
const ATTRIBUTION_URL: &str = "https://open-meteo.com/";
const FREE_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
const CUSTOMER_BASE_URL: &str = "https://customer-api.open-meteo.com/v1/forecast";
const GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,\
cloud_cover,pressure_msl,wind_speed_10m,wind_direction_10m,wind_gusts_10m,weather_code,is_day";

const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,apparent_temperature_max,\
apparent_temperature_min,sunrise,sunset,uv_index_max,precipitation_sum,precipitation_probability_max,\
wind_speed_10m_max,wind_gusts_10m_max,wind_direction_10m_dominant,weather_code";

// Not offered under "current"; fetched for the first hour and merged in.
const HOURLY_FIELDS: &str = "dew_point_2m,uv_index,visibility";

/// Open-Meteo forecast API. Metric-native; keyless unless a customer key is set.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    api_key: Option<String>,
    base_url: Url,
    fill_current_with_hourly: bool,
    wmo: WmoCodeTable,
}

impl OpenMeteoProvider {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let base_url = if api_key.is_some() {
            CUSTOMER_BASE_URL
        } else {
            FREE_BASE_URL
        };

        Ok(Self {
            api_key,
            base_url: parse_url(base_url)?,
            fill_current_with_hourly: true,
            wmo: WmoCodeTable::bundled()?,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_url(base_url)?;
        Ok(self)
    }

    /// Merge the first hourly dew point / UV index / visibility into current
    /// conditions. Costs extra API quota.
    pub fn fill_current_with_hourly(mut self, enabled: bool) -> Self {
        self.fill_current_with_hourly = enabled;
        self
    }

    fn summarize(&self, code: Option<i64>, is_day: bool) -> (Option<String>, Option<String>) {
        let Some(code) = code else {
            return (None, None);
        };

        match self.wmo.lookup(code, is_day) {
            Some(entry) => (Some(entry.description.clone()), Some(entry.image.clone())),
            None => {
                warn!(code, "unknown WMO weather code");
                (None, None)
            }
        }
    }

    fn map_current(
        &self,
        tz: &Tz,
        current: OmCurrent,
        hourly: Option<&OmHourly>,
    ) -> Result<WeatherConditions> {
        let time = local_time(NAME, tz, current.time)?;
        let is_day = current.is_day != Some(0);
        let (summary, icon) = self.summarize(current.weather_code, is_day);

        let first =
            |values: Option<&Vec<Option<f64>>>| values.and_then(|v| v.first().copied().flatten());
        let dew_point = first(hourly.map(|h| &h.dew_point_2m));
        let uv_index = first(hourly.map(|h| &h.uv_index));
        let visibility_m = first(hourly.map(|h| &h.visibility));

        Ok(WeatherConditions {
            summary,
            weather_code: current.weather_code.map(WeatherCode::Numeric),
            icon,
            temperature: current.temperature_2m.map(Temperature::celsius),
            feels_like: current.apparent_temperature.map(Temperature::celsius),
            dew_point: dew_point.map(Temperature::celsius),
            humidity: current.relative_humidity_2m,
            pressure: current.pressure_msl,
            precipitation: Precipitation::optional(None, current.precipitation, None)?,
            cloud_cover: current.cloud_cover,
            wind: make_wind(
                Direction::optional(current.wind_direction_10m),
                current.wind_speed_10m,
                current.wind_gusts_10m,
                SpeedUnit::Kph,
            ),
            uv_index,
            visibility: visibility_m.map(|m| Distance::kilometers(m / 1000.0)),
            ..WeatherConditions::at(time)
        })
    }

    fn map_daily(&self, tz: &Tz, daily: &OmDaily) -> Result<Vec<WeatherConditions>> {
        let mut days = Vec::with_capacity(daily.time.len());

        for (i, &ts) in daily.time.iter().enumerate() {
            let code = at(&daily.weather_code, i);
            let (summary, icon) = self.summarize(code, true);
            let sunrise = at(&daily.sunrise, i).map(|t| local_time(NAME, tz, t)).transpose()?;
            let sunset = at(&daily.sunset, i).map(|t| local_time(NAME, tz, t)).transpose()?;

            days.push(WeatherConditions {
                summary,
                weather_code: code.map(WeatherCode::Numeric),
                icon,
                precipitation: Precipitation::optional(
                    at(&daily.precipitation_probability_max, i),
                    at(&daily.precipitation_sum, i),
                    None,
                )?,
                wind: make_wind(
                    Direction::optional(at(&daily.wind_direction_10m_dominant, i)),
                    at(&daily.wind_speed_10m_max, i),
                    at(&daily.wind_gusts_10m_max, i),
                    SpeedUnit::Kph,
                ),
                uv_index: at(&daily.uv_index_max, i),
                sunrise,
                sunset,
                low_temperature: at(&daily.temperature_2m_min, i).map(Temperature::celsius),
                high_temperature: at(&daily.temperature_2m_max, i).map(Temperature::celsius),
                low_feels_like: at(&daily.apparent_temperature_min, i).map(Temperature::celsius),
                high_feels_like: at(&daily.apparent_temperature_max, i).map(Temperature::celsius),
                ..WeatherConditions::at(local_time(NAME, tz, ts)?)
            });
        }

        Ok(days)
    }
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    timezone: String,
    current: OmCurrent,
    hourly: Option<OmHourly>,
    daily: Option<OmDaily>,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    time: i64,
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    precipitation: Option<f64>,
    cloud_cover: Option<f64>,
    pressure_msl: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    wind_gusts_10m: Option<f64>,
    weather_code: Option<i64>,
    is_day: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OmHourly {
    dew_point_2m: Vec<Option<f64>>,
    uv_index: Vec<Option<f64>>,
    visibility: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OmDaily {
    time: Vec<i64>,
    weather_code: Vec<Option<i64>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
    apparent_temperature_max: Vec<Option<f64>>,
    apparent_temperature_min: Vec<Option<f64>>,
    sunrise: Vec<Option<i64>>,
    sunset: Vec<Option<i64>>,
    uv_index_max: Vec<Option<f64>>,
    precipitation_sum: Vec<Option<f64>>,
    precipitation_probability_max: Vec<Option<f64>>,
    wind_speed_10m_max: Vec<Option<f64>>,
    wind_gusts_10m_max: Vec<Option<f64>>,
    wind_direction_10m_dominant: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmGeocodeResponse {
    #[serde(default)]
    results: Vec<OmGeocodeHit>,
}

#[derive(Debug, Deserialize)]
struct OmGeocodeHit {
    latitude: f64,
    longitude: f64,
}

/// `{"error": true, "reason": "..."}`
fn check_error(data: &Value) -> Option<String> {
    if data.get("error").and_then(Value::as_bool) == Some(true) {
        Some(error_message(data, "reason").unwrap_or_else(|| "unknown error".to_string()))
    } else {
        None
    }
}

impl WeatherProvider for OpenMeteoProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request_url(&self, location: &Location, forecast_days: u32) -> Result<Url> {
        let LatLon { lat, lon } = require_coordinates(NAME, location)?;

        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("latitude", &lat.to_string())
                .append_pair("longitude", &lon.to_string())
                .append_pair("timezone", "auto")
                .append_pair("timeformat", "unixtime")
                .append_pair("current", CURRENT_FIELDS);

            if forecast_days > 0 {
                query
                    .append_pair("daily", DAILY_FIELDS)
                    .append_pair("forecast_days", &forecast_days.to_string());
            }
            if let Some(key) = &self.api_key {
                query.append_pair("apikey", key);
            }
            if self.fill_current_with_hourly {
                query
                    .append_pair("hourly", HOURLY_FIELDS)
                    .append_pair("forecast_hours", "1");
            }
        }

        Ok(url)
    }

    fn map_response(&self, _location: &Location, data: Value) -> Result<WeatherResponse> {
        if let Some(reason) = check_error(&data) {
            return Err(ApiError::Upstream(reason).into());
        }

        let parsed: OmResponse = decode(NAME, data)?;
        let tz: Tz = parsed
            .timezone
            .parse()
            .map_err(|_| Error::InvalidTimezone(parsed.timezone.clone()))?;

        let current = self.map_current(&tz, parsed.current, parsed.hourly.as_ref())?;
        let daily_forecast = match &parsed.daily {
            Some(daily) => self.map_daily(&tz, daily)?,
            None => Vec::new(),
        };
        debug!(days = daily_forecast.len(), "mapped Open-Meteo response");

        Ok(WeatherResponse::new(NAME, ATTRIBUTION_URL, current, daily_forecast))
    }

    fn geocode_url(&self, place: &str) -> Result<Option<Url>> {
        let mut url = parse_url(GEOCODE_URL)?;
        url.query_pairs_mut()
            .append_pair("name", place)
            .append_pair("count", "1")
            .append_pair("format", "json")
            .append_pair("language", "en");
        Ok(Some(url))
    }

    fn parse_geocode(&self, place: &str, data: Value) -> Result<LatLon> {
        if let Some(reason) = check_error(&data) {
            return Err(ApiError::Geocode(reason).into());
        }

        let parsed: OmGeocodeResponse = decode(NAME, data)?;
        parsed
            .results
            .first()
            .map(|hit| LatLon::new(hit.latitude, hit.longitude))
            .ok_or_else(|| ApiError::Geocode(format!("No results for {place:?}")).into())
    }
}
