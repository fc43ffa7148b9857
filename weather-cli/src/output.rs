//! Human-readable rendering of weather responses.

use std::fmt::Write;

use multiweather::{Config, ProviderId, UnitValue, WeatherConditions, WeatherResponse};

/// Current conditions followed by one line per forecast day.
pub fn render(response: &WeatherResponse) -> String {
    let mut out = String::new();
    let current = &response.current;

    let _ = writeln!(out, "{} ({})", response.name, response.url);
    let _ = writeln!(
        out,
        "Now, {}: {}",
        current.time.format("%Y-%m-%d %H:%M %:z"),
        describe(current)
    );

    for (label, value) in current_lines(current) {
        let _ = writeln!(out, "  {label:<12} {value}");
    }

    if !response.daily_forecast.is_empty() {
        let _ = writeln!(out, "Forecast:");
        for day in &response.daily_forecast {
            let _ = writeln!(out, "  {}", forecast_line(day));
        }
    }

    out
}

/// Supported providers, marking the default and those ready to use.
pub fn render_providers(config: &Config, default: ProviderId) -> String {
    let mut out = String::new();
    for id in ProviderId::all() {
        let marker = if *id == default { "*" } else { " " };
        let status = if config.is_provider_configured(*id) {
            "ready"
        } else {
            "needs API key"
        };
        let _ = writeln!(out, "{marker} {:<16} {status}", id.as_str());
    }
    out
}

fn describe(conditions: &WeatherConditions) -> String {
    match (&conditions.summary, &conditions.weather_code) {
        (Some(summary), _) => summary.clone(),
        (None, Some(code)) => format!("weather code {code}"),
        (None, None) => "no summary".to_string(),
    }
}

fn current_lines(c: &WeatherConditions) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();

    if let Some(t) = &c.temperature {
        let mut value = t.format();
        if let Some(feels) = &c.feels_like {
            value.push_str(&format!(" (feels like {feels})"));
        }
        lines.push(("Temperature", value));
    }
    if let Some(d) = &c.dew_point {
        lines.push(("Dew point", d.format()));
    }
    if let Some(h) = c.humidity {
        lines.push(("Humidity", format!("{h:.0}%")));
    }
    if let Some(p) = c.pressure {
        lines.push(("Pressure", format!("{p:.1} hPa")));
    }
    if let Some(p) = &c.precipitation {
        lines.push(("Precip", p.format()));
    }
    if let Some(cc) = c.cloud_cover {
        lines.push(("Cloud cover", format!("{cc:.0}%")));
    }
    if let Some(w) = &c.wind {
        let mut value = format!("{} from {}", w.speed, w.direction);
        if let Some(gust) = &w.gust {
            value.push_str(&format!(", gusting {gust}"));
        }
        lines.push(("Wind", value));
    }
    if let Some(uv) = c.uv_index {
        lines.push(("UV index", format!("{uv:.1}")));
    }
    if let Some(v) = &c.visibility {
        lines.push(("Visibility", v.format()));
    }

    lines
}

fn forecast_line(day: &WeatherConditions) -> String {
    let mut line = format!("{}: {}", day.time.format("%a %Y-%m-%d"), describe(day));

    match (&day.low_temperature, &day.high_temperature) {
        (Some(low), Some(high)) => line.push_str(&format!(", {low} to {high}")),
        (None, Some(high)) => line.push_str(&format!(", high {high}")),
        (Some(low), None) => line.push_str(&format!(", low {low}")),
        (None, None) => {}
    }
    if let Some(p) = &day.precipitation {
        line.push_str(&format!(", precip {p}"));
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use multiweather::{Direction, Precipitation, SpeedUnit, Temperature, model::make_wind};

    fn response() -> WeatherResponse {
        let tz = FixedOffset::west_opt(7 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 9, 10, 14, 30, 0).unwrap();
        let tomorrow = tz.with_ymd_and_hms(2024, 9, 11, 0, 0, 0).unwrap();

        let current = WeatherConditions {
            summary: Some("Overcast".into()),
            temperature: Some(Temperature::celsius(15.0)),
            humidity: Some(72.0),
            wind: make_wind(Some(Direction::new(280.0)), Some(12.0), None, SpeedUnit::Kph),
            ..WeatherConditions::at(now)
        };
        let day = WeatherConditions {
            summary: Some("Rain".into()),
            low_temperature: Some(Temperature::celsius(10.0)),
            high_temperature: Some(Temperature::celsius(17.0)),
            precipitation: Precipitation::optional(Some(80.0), None, None).unwrap(),
            ..WeatherConditions::at(tomorrow)
        };

        WeatherResponse::new("Open-Meteo.com", "https://open-meteo.com/", current, vec![day])
    }

    #[test]
    fn renders_current_and_forecast() {
        let text = render(&response());

        assert!(text.starts_with("Open-Meteo.com (https://open-meteo.com/)\n"));
        assert!(text.contains("Now, 2024-09-10 14:30 -07:00: Overcast"));
        assert!(text.contains("15.0C / 59.0F"));
        assert!(text.contains("72%"));
        assert!(text.contains("from W"));
        assert!(text.contains(
            "Forecast:\n  Wed 2024-09-11: Rain, 10.0C / 50.0F to 17.0C / 62.6F, precip 80.0%"
        ));
        assert!(!text.contains("Visibility"));
    }

    #[test]
    fn omits_forecast_section_when_empty() {
        let mut resp = response();
        resp.daily_forecast.clear();
        assert!(!render(&resp).contains("Forecast:"));
    }

    #[test]
    fn provider_listing_marks_default() {
        let text = render_providers(&Config::default(), ProviderId::OpenMeteo);
        let first = text.lines().next().unwrap();

        assert!(first.starts_with("* openmeteo"));
        assert!(first.ends_with("ready"));
        assert_eq!(text.lines().count(), ProviderId::all().len());
    }
}
