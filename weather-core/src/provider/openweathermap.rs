use chrono::FixedOffset;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{ApiError, Error, Result},
    model::{LatLon, Location, WeatherCode, WeatherConditions, WeatherResponse, make_wind},
    units::{Direction, Distance, Precipitation, SpeedUnit, Temperature},
};

use super::{
    ProviderId, WeatherProvider, decode, error_message, local_time, parse_url, require_coordinates,
};

const NAME: &str = "OpenWeatherMap";
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const GEOCODE_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";

/// OpenWeatherMap current weather (v2.5). No daily forecast.
#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    api_key: String,
    base_url: String,
}

impl OpenWeatherMapProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        parse_url(base_url)?;
        self.base_url = base_url.to_string();
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    dt: i64,
    /// Shift from UTC in seconds.
    timezone: i32,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    main: OwmMain,
    clouds: Option<OwmClouds>,
    wind: Option<OwmWind>,
    /// Metres.
    visibility: Option<f64>,
    rain: Option<OwmVolume>,
    snow: Option<OwmVolume>,
    sys: Option<OwmSys>,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    id: i64,
    main: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: Option<f64>,
    deg: Option<f64>,
    gust: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmVolume {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

impl OwmVolume {
    fn amount(&self) -> Option<f64> {
        self.one_hour.or(self.three_hours)
    }
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwmGeocodeHit {
    lat: f64,
    lon: f64,
}

/// Error bodies carry a `cod` other than 200 (sometimes as a string) and a `message`.
fn check_error(data: &Value) -> Option<String> {
    let cod = data.get("cod")?;
    let code = cod
        .as_i64()
        .or_else(|| cod.as_str().and_then(|s| s.parse().ok()));

    if code == Some(200) {
        return None;
    }
    Some(error_message(data, "message").unwrap_or_else(|| format!("error code {cod}")))
}

fn attribution_url(LatLon { lat, lon }: LatLon) -> String {
    format!("https://openweathermap.org/weathermap?lat={lat}&lon={lon}&zoom=12")
}

impl WeatherProvider for OpenWeatherMapProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeatherMap
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn build_request_url(&self, location: &Location, forecast_days: u32) -> Result<Url> {
        let LatLon { lat, lon } = require_coordinates(NAME, location)?;
        if forecast_days > 0 {
            debug!(forecast_days, "OpenWeatherMap backend only reports current conditions");
        }

        let mut url = parse_url(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("appid", &self.api_key)
            .append_pair("lat", &lat.to_string())
            .append_pair("lon", &lon.to_string())
            // default is Kelvin
            .append_pair("units", "metric");
        Ok(url)
    }

    fn map_response(&self, location: &Location, data: Value) -> Result<WeatherResponse> {
        if let Some(message) = check_error(&data) {
            return Err(ApiError::Upstream(message).into());
        }

        let coords = require_coordinates(NAME, location)?;
        let parsed: OwmResponse = decode(NAME, data)?;
        let tz = FixedOffset::east_opt(parsed.timezone)
            .ok_or_else(|| Error::InvalidTimezone(parsed.timezone.to_string()))?;

        let condition = parsed.weather.first();
        let amount = parsed
            .rain
            .as_ref()
            .and_then(OwmVolume::amount)
            .or_else(|| parsed.snow.as_ref().and_then(OwmVolume::amount))
            .unwrap_or(0.0);
        let wind = parsed.wind.as_ref();
        let sys = parsed.sys.as_ref();

        let current = WeatherConditions {
            summary: condition.map(|c| c.main.clone()),
            weather_code: condition.map(|c| WeatherCode::Numeric(c.id)),
            icon: condition.map(|c| format!("https://openweathermap.org/img/wn/{}@2x.png", c.icon)),
            temperature: parsed.main.temp.map(Temperature::celsius),
            feels_like: parsed.main.feels_like.map(Temperature::celsius),
            humidity: parsed.main.humidity,
            pressure: parsed.main.pressure,
            precipitation: Some(Precipitation::millimeters(amount)),
            cloud_cover: parsed.clouds.as_ref().and_then(|c| c.all),
            wind: make_wind(
                Direction::optional(wind.and_then(|w| w.deg)),
                wind.and_then(|w| w.speed),
                wind.and_then(|w| w.gust),
                SpeedUnit::Ms,
            ),
            visibility: parsed.visibility.map(|m| Distance::kilometers(m / 1000.0)),
            sunrise: sys
                .and_then(|s| s.sunrise)
                .map(|t| local_time(NAME, &tz, t))
                .transpose()?,
            sunset: sys
                .and_then(|s| s.sunset)
                .map(|t| local_time(NAME, &tz, t))
                .transpose()?,
            // spread across large areas, not a daily range
            low_temperature: parsed.main.temp_min.map(Temperature::celsius),
            high_temperature: parsed.main.temp_max.map(Temperature::celsius),
            ..WeatherConditions::at(local_time(NAME, &tz, parsed.dt)?)
        };

        Ok(WeatherResponse::new(NAME, attribution_url(coords), current, Vec::new()))
    }

    fn geocode_url(&self, place: &str) -> Result<Option<Url>> {
        let mut url = parse_url(GEOCODE_URL)?;
        url.query_pairs_mut()
            .append_pair("q", place)
            .append_pair("limit", "1")
            .append_pair("appid", &self.api_key);
        Ok(Some(url))
    }

    fn parse_geocode(&self, place: &str, data: Value) -> Result<LatLon> {
        if let Some(message) = check_error(&data) {
            return Err(ApiError::Geocode(message).into());
        }

        let hits: Vec<OwmGeocodeHit> = decode(NAME, data)?;
        hits.first()
            .map(|hit| LatLon::new(hit.lat, hit.lon))
            .ok_or_else(|| ApiError::Geocode(format!("No results for {place:?}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> OpenWeatherMapProvider {
        OpenWeatherMapProvider::new("OPEN_KEY".into())
    }

    fn sample() -> Value {
        json!({
            "coord": {"lon": 2.0, "lat": 48.0},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {
                "temp": 14.2, "feels_like": 13.9, "temp_min": 13.0, "temp_max": 15.1,
                "pressure": 1009, "humidity": 82
            },
            "visibility": 10000,
            "wind": {"speed": 4.6, "deg": 250, "gust": 9.3},
            "rain": {"3h": 1.7},
            "clouds": {"all": 75},
            "dt": 1_726_000_000,
            "sys": {"sunrise": 1_725_980_000, "sunset": 1_726_026_000},
            "timezone": 7200,
            "name": "Chartres",
            "cod": 200
        })
    }

    #[test]
    fn request_url_uses_metric_units() {
        let url = provider()
            .build_request_url(&Location::from((48.0, 2.0)), 0)
            .unwrap();

        assert!(url.as_str().starts_with(DEFAULT_BASE_URL));
        assert_eq!(url.query(), Some("appid=OPEN_KEY&lat=48&lon=2&units=metric"));
    }

    #[test]
    fn maps_current_conditions() {
        let resp = provider()
            .map_response(&Location::from((48.0, 2.0)), sample())
            .unwrap();

        assert_eq!(resp.name, "OpenWeatherMap");
        assert_eq!(resp.url, "https://openweathermap.org/weathermap?lat=48&lon=2&zoom=12");
        assert!(resp.daily_forecast.is_empty());

        let c = &resp.current;
        assert_eq!(c.time.offset().local_minus_utc(), 7200);
        assert_eq!(c.summary.as_deref(), Some("Rain"));
        assert_eq!(c.weather_code, Some(WeatherCode::Numeric(500)));
        assert_eq!(c.icon.as_deref(), Some("https://openweathermap.org/img/wn/10d@2x.png"));
        assert_eq!(c.temperature, Some(Temperature::celsius(14.2)));
        assert_eq!(c.humidity, Some(82.0));
        assert_eq!(c.pressure, Some(1009.0));
        assert_eq!(c.cloud_cover, Some(75.0));
        assert_eq!(c.precipitation, Some(Precipitation::millimeters(1.7)));
        assert_eq!(c.visibility, Some(Distance::kilometers(10.0)));
        assert_eq!(c.high_temperature, Some(Temperature::celsius(15.1)));
        assert!(c.sunrise.unwrap() < c.sunset.unwrap());
        assert_eq!(c.dew_point, None);
        assert_eq!(c.uv_index, None);

        let wind = c.wind.as_ref().unwrap();
        assert_eq!(wind.speed.ms(), Some(4.6));
        assert_eq!(wind.gust.unwrap().ms(), Some(9.3));
        assert_eq!(wind.direction.compass_point(), "WSW");
    }

    #[test]
    fn missing_rain_means_zero_precipitation() {
        let mut data = sample();
        data.as_object_mut().unwrap().remove("rain");
        data["snow"] = json!({"1h": 0.4});

        let resp = provider().map_response(&Location::from((48.0, 2.0)), data.clone()).unwrap();
        assert_eq!(resp.current.precipitation, Some(Precipitation::millimeters(0.4)));

        data.as_object_mut().unwrap().remove("snow");
        let resp = provider().map_response(&Location::from((48.0, 2.0)), data).unwrap();
        assert_eq!(resp.current.precipitation.unwrap().mm(), Some(0.0));
    }

    #[test]
    fn error_payload_is_surfaced() {
        let err = provider()
            .map_response(
                &Location::from((48.0, 2.0)),
                json!({"cod": 401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info."}),
            )
            .unwrap_err();
        assert!(
            matches!(err, Error::Api(ApiError::Upstream(ref m)) if m.starts_with("Invalid API key"))
        );

        let err = provider()
            .map_response(
                &Location::from((48.0, 2.0)),
                json!({"cod": "400", "message": "wrong latitude"}),
            )
            .unwrap_err();
        assert!(err.to_string().contains("wrong latitude"));
    }

    #[test]
    fn geocode_lookup() {
        let p = provider();
        let url = p.geocode_url("London").unwrap().unwrap();
        assert_eq!(url.query(), Some("q=London&limit=1&appid=OPEN_KEY"));

        let hit = p
            .parse_geocode("London", json!([{"name": "London", "lat": 51.5073, "lon": -0.1277}]))
            .unwrap();
        assert_eq!(hit, LatLon::new(51.5073, -0.1277));

        let miss = p.parse_geocode("Xyzzy", json!([])).unwrap_err();
        assert!(matches!(miss, Error::Api(ApiError::Geocode(_))));

        let denied = p
            .parse_geocode("London", json!({"cod": 401, "message": "Invalid API key"}))
            .unwrap_err();
        assert!(matches!(denied, Error::Api(ApiError::Geocode(ref m)) if m == "Invalid API key"));
    }
}
