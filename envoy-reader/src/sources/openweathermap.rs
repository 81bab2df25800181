use std::time::Duration;

use serde::Deserialize;

use super::{get_text, http_client};
use crate::pipeline::{FetchError, WeatherProvider};

const DEFAULT_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Current conditions at a coordinate from OpenWeatherMap.
pub struct OpenWeatherMap {
    url: String,
    api_key: String,
    lat: f64,
    lon: f64,
    timeout: Duration,
}

impl OpenWeatherMap {
    pub fn new(api_key: &str, lat: f64, lon: f64, url: Option<&str>, timeout: Duration) -> Self {
        Self {
            url: url.unwrap_or(DEFAULT_URL).to_string(),
            api_key: api_key.to_string(),
            lat,
            lon,
            timeout,
        }
    }
}

#[derive(Deserialize)]
struct WeatherResponse {
    main: Option<MainSection>,
}

#[derive(Deserialize)]
struct MainSection {
    temp: Option<f64>,
}

pub fn parse_temperature(body: &str) -> Result<f64, FetchError> {
    let response: WeatherResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("openweathermap: {e}")))?;

    response
        .main
        .and_then(|m| m.temp)
        .ok_or_else(|| FetchError::MissingData("openweathermap response has no main.temp".to_string()))
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherMap {
    fn describe(&self) -> String {
        format!("openweathermap at lat {} lon {}", self.lat, self.lon)
    }

    async fn current_temperature(&self) -> Result<f64, FetchError> {
        let client = http_client(self.timeout)?;
        let request = client.get(&self.url).query(&[
            ("lat", self.lat.to_string()),
            ("lon", self.lon.to_string()),
            ("mode", "json".to_string()),
            ("units", "metric".to_string()),
            ("APPID", self.api_key.clone()),
        ]);
        let body = get_text(&self.url, request).await?;
        parse_temperature(&body)
    }
}
