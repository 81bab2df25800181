pub mod buienradar;
pub mod envoy_gateway;
pub mod openweathermap;

use std::{sync::Arc, time::Duration};

pub use buienradar::Buienradar;
pub use envoy_gateway::EnvoyGateway;
pub use openweathermap::OpenWeatherMap;

use crate::{
    config::WeatherConfig,
    pipeline::{FetchError, WeatherProvider},
};

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, FetchError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Send `request` and return the body of a 2xx response.
pub(crate) async fn get_text(url: &str, request: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}

/// The single weather provider of this run. OpenWeatherMap takes precedence
/// over Buienradar when both are configured.
pub fn weather_provider(cfg: Option<&WeatherConfig>, timeout: Duration) -> Option<Arc<dyn WeatherProvider>> {
    let cfg = cfg?;

    if let Some(owm) = &cfg.openweathermap {
        return Some(Arc::new(OpenWeatherMap::new(
            &owm.api_key,
            owm.lat,
            owm.lon,
            owm.url.as_deref(),
            timeout,
        )));
    }

    cfg.buienradar.as_ref().map(|br| {
        Arc::new(Buienradar::new(br.station_id, br.url.as_deref(), timeout)) as Arc<dyn WeatherProvider>
    })
}
