//! Calls the real Open-Meteo endpoints. Run with `cargo test -- --ignored`.

use std::time::Duration;

use chrono::Utc;

use multiweather::{Location, ProviderConfig, ProviderId, UnitValue};

fn open_meteo() -> Box<dyn multiweather::WeatherProvider> {
    ProviderId::OpenMeteo
        .build(&ProviderConfig::default())
        .expect("open-meteo needs no key")
}

#[test]
#[ignore = "hits the network"]
fn open_meteo_sync_with_forecast() {
    let resp = open_meteo()
        .get_weather_sync(&Location::from((49.0, -123.0)), Duration::from_secs(20), 3)
        .expect("weather request");

    assert_eq!(resp.name, "Open-Meteo.com");
    let age = Utc::now().signed_duration_since(resp.current.time);
    assert!(age.num_hours().abs() < 12, "current conditions are {age} old");
    assert!(resp.current.summary.is_some());
    assert!(resp.daily_forecast.len() >= 3);
    assert!(resp.current.temperature.is_some_and(|t| t.has_data()));
    assert!(
        resp.daily_forecast
            .windows(2)
            .all(|pair| pair[0].time < pair[1].time)
    );
}

#[tokio::test]
#[ignore = "hits the network"]
async fn open_meteo_async_current_only() {
    let resp = open_meteo()
        .get_weather(&Location::from((49.0, -123.0)), 0)
        .await
        .expect("weather request");

    assert!(resp.daily_forecast.is_empty());
    assert!(resp.current.summary.is_some());
}

#[tokio::test]
#[ignore = "hits the network"]
async fn open_meteo_geocodes_place_names() {
    let resp = open_meteo()
        .get_weather(&Location::from("Vancouver"), 1)
        .await
        .expect("weather request");

    assert_eq!(resp.daily_forecast.len(), 1);
}

#[tokio::test]
#[ignore = "hits the network"]
async fn open_meteo_reports_unknown_places() {
    let err = open_meteo()
        .get_weather(&Location::from("Qzxqzxqzx Nowhere"), 0)
        .await
        .unwrap_err();

    assert!(err.is_api_error());
}
