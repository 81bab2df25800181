use std::time::Duration;

use serde::Deserialize;

use super::{get_text, http_client};
use crate::pipeline::{FetchError, WeatherProvider};

const DEFAULT_URL: &str = "https://data.buienradar.nl/2.0/feed/json";
pub const DEFAULT_STATION_ID: i64 = 6260;

/// Latest measurement of a single Buienradar weather station.
pub struct Buienradar {
    url: String,
    station_id: i64,
    timeout: Duration,
}

impl Buienradar {
    pub fn new(station_id: i64, url: Option<&str>, timeout: Duration) -> Self {
        Self {
            url: url.unwrap_or(DEFAULT_URL).to_string(),
            station_id,
            timeout,
        }
    }
}

#[derive(Deserialize)]
struct Feed {
    actual: Option<Actual>,
}

#[derive(Deserialize)]
struct Actual {
    #[serde(default)]
    stationmeasurements: Vec<StationMeasurement>,
}

#[derive(Deserialize)]
struct StationMeasurement {
    stationid: i64,
    temperature: Option<f64>,
}

pub fn parse_station_temperature(body: &str, station_id: i64) -> Result<f64, FetchError> {
    let feed: Feed = serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("buienradar: {e}")))?;

    let actual = feed
        .actual
        .ok_or_else(|| FetchError::MissingData("buienradar feed has no actual section".to_string()))?;

    let station = actual
        .stationmeasurements
        .into_iter()
        .find(|m| m.stationid == station_id)
        .ok_or(FetchError::StationNotFound(station_id))?;

    station
        .temperature
        .ok_or_else(|| FetchError::MissingData(format!("station {station_id} reports no temperature")))
}

#[async_trait::async_trait]
impl WeatherProvider for Buienradar {
    fn describe(&self) -> String {
        format!("buienradar station {}", self.station_id)
    }

    async fn current_temperature(&self) -> Result<f64, FetchError> {
        let client = http_client(self.timeout)?;
        let body = get_text(&self.url, client.get(&self.url)).await?;
        parse_station_temperature(&body, self.station_id)
    }
}
