use std::{fmt::Display, time::Duration};

use chrono::{DateTime, Local, TimeZone};
use envoy_client::SystemReading;

use crate::pipeline::{Reading, Sink, WriteError, WriteOutcome};

const DEFAULT_ADD_STATUS_URL: &str = "https://pvoutput.org/service/r2/addstatus.jsp";

/// Form parameters of an add-status upload for `system`, stamped in `tz`.
///
/// `c1=1` marks `v1` as a lifetime counter. `v5` is only present when a
/// temperature is known.
pub fn status_params<Tz>(system: &SystemReading, tz: &Tz, temperature: Option<f64>) -> Vec<(&'static str, String)>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let utc = DateTime::from_timestamp(system.reading_time, 0).unwrap_or_default();
    let local = utc.with_timezone(tz);

    let mut params = vec![
        ("d", local.format("%Y%m%d").to_string()),
        ("t", local.format("%H:%M").to_string()),
        ("v1", system.wh_lifetime.to_string()),
        ("v2", system.w_now.to_string()),
        ("c1", "1".to_string()),
    ];
    if let Some(t) = temperature {
        params.push(("v5", t.to_string()));
    }
    params
}

/// Transport for a single status upload.
#[async_trait::async_trait]
pub trait StatusUploader: Send + Sync {
    async fn add_status(&self, params: Vec<(&'static str, String)>) -> Result<(), WriteError>;
}

pub struct PvOutputHttpUploader {
    url: String,
    api_key: String,
    system_id: String,
    timeout: Duration,
}

impl PvOutputHttpUploader {
    pub fn new(api_key: &str, system_id: &str, url: Option<&str>, timeout: Duration) -> Self {
        Self {
            url: url.unwrap_or(DEFAULT_ADD_STATUS_URL).to_string(),
            api_key: api_key.to_string(),
            system_id: system_id.to_string(),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl StatusUploader for PvOutputHttpUploader {
    async fn add_status(&self, params: Vec<(&'static str, String)>) -> Result<(), WriteError> {
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let response = client
            .post(&self.url)
            .header("X-Pvoutput-Apikey", &self.api_key)
            .header("X-Pvoutput-SystemId", &self.system_id)
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(WriteError::Backend(body))
    }
}

pub struct PvOutputSink<U = PvOutputHttpUploader> {
    description: String,
    uploader: U,
}

impl PvOutputSink<PvOutputHttpUploader> {
    pub fn new(api_key: &str, system_id: &str, url: Option<&str>, timeout: Duration) -> Self {
        Self {
            description: format!("pvoutput system {system_id}"),
            uploader: PvOutputHttpUploader::new(api_key, system_id, url, timeout),
        }
    }
}

impl<U: StatusUploader> PvOutputSink<U> {
    pub fn with_uploader(description: &str, uploader: U) -> Self {
        Self {
            description: description.to_string(),
            uploader,
        }
    }
}

#[async_trait::async_trait]
impl<U: StatusUploader> Sink for PvOutputSink<U> {
    fn name(&self) -> &str {
        "pvoutput"
    }

    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn write(&self, reading: &Reading) -> Result<WriteOutcome, WriteError> {
        if !reading.system.is_valid() {
            return Ok(WriteOutcome::NotNeeded);
        }

        let temperature = match reading.temperature().await {
            Some(Ok(t)) => Some(t),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "could not fetch temperature, uploading status without it");
                None
            }
            None => None,
        };

        let params = status_params(&reading.system, &Local, temperature);
        self.uploader.add_status(params).await?;

        Ok(WriteOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{FixedOffset, Utc};
    use envoy_client::{InverterReading, InverterRecord};

    use super::*;
    use crate::pipeline::{FetchError, WeatherProvider};
    use crate::testing::FakeServer;

    #[derive(Default)]
    struct RecordingUploader {
        calls: Mutex<Vec<Vec<(&'static str, String)>>>,
        fail_with: Option<String>,
    }

    #[async_trait::async_trait]
    impl StatusUploader for RecordingUploader {
        async fn add_status(&self, params: Vec<(&'static str, String)>) -> Result<(), WriteError> {
            self.calls.lock().unwrap().push(params);
            match &self.fail_with {
                Some(msg) => Err(WriteError::Backend(msg.clone())),
                None => Ok(()),
            }
        }
    }

    struct FixedWeather(Result<f64, FetchError>);

    #[async_trait::async_trait]
    impl WeatherProvider for FixedWeather {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        async fn current_temperature(&self) -> Result<f64, FetchError> {
            self.0.clone()
        }
    }

    fn system(reading_time: i64) -> SystemReading {
        SystemReading {
            reading_time,
            active_count: 3,
            w_now: 500,
            wh_lifetime: 123_456,
        }
    }

    fn valid_inverter() -> InverterRecord {
        InverterRecord {
            production: InverterReading {
                serial_number: "INV1".to_string(),
                last_report_date: 1_700_000_000,
                last_report_watts: 200,
                max_report_watts: 250,
            },
            device: None,
        }
    }

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn status_params_use_the_given_timezone() {
        // 2023-11-14 22:13:20 UTC
        let utc = status_params(&system(1_700_000_000), &Utc, None);
        assert_eq!(param(&utc, "d"), Some("20231114"));
        assert_eq!(param(&utc, "t"), Some("22:13"));

        let cet = FixedOffset::east_opt(3600).unwrap();
        let local = status_params(&system(1_700_000_000), &cet, None);
        assert_eq!(param(&local, "d"), Some("20231114"));
        assert_eq!(param(&local, "t"), Some("23:13"));

        let ahead = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(param(&status_params(&system(1_700_000_000), &ahead, None), "d"), Some("20231115"));
    }

    #[test]
    fn status_params_carry_energy_power_and_cumulative_flag() {
        let params = status_params(&system(1_700_000_000), &Utc, None);

        assert_eq!(param(&params, "v1"), Some("123456"));
        assert_eq!(param(&params, "v2"), Some("500"));
        assert_eq!(param(&params, "c1"), Some("1"));
        assert_eq!(param(&params, "v5"), None);
        assert_eq!(params.len(), 5);
    }

    #[tokio::test]
    async fn invalid_system_reading_is_not_uploaded() {
        let sink = PvOutputSink::with_uploader("test", RecordingUploader::default());
        let reading = Reading::new(system(0), vec![valid_inverter()]);

        assert_eq!(sink.write(&reading).await.unwrap(), WriteOutcome::NotNeeded);
        assert!(sink.uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn temperature_is_appended_when_available() {
        let sink = PvOutputSink::with_uploader("test", RecordingUploader::default());
        let weather: Arc<dyn WeatherProvider> = Arc::new(FixedWeather(Ok(14.25)));
        let reading = Reading::new(system(1_700_000_000), Vec::new()).with_weather(Some(weather));

        assert_eq!(sink.write(&reading).await.unwrap(), WriteOutcome::Written);

        let calls = sink.uploader.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let v5: f64 = param(&calls[0], "v5").unwrap().parse().unwrap();
        assert_eq!(v5, 14.25);
    }

    #[tokio::test]
    async fn failed_temperature_lookup_still_uploads_without_it() {
        let sink = PvOutputSink::with_uploader("test", RecordingUploader::default());
        let weather: Arc<dyn WeatherProvider> = Arc::new(FixedWeather(Err(FetchError::StationNotFound(6260))));
        let reading = Reading::new(system(1_700_000_000), Vec::new()).with_weather(Some(weather));

        assert_eq!(sink.write(&reading).await.unwrap(), WriteOutcome::Written);

        let calls = sink.uploader.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(param(&calls[0], "v5"), None);
        assert_eq!(param(&calls[0], "v1"), Some("123456"));
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_response_body() {
        let uploader = RecordingUploader {
            fail_with: Some("Bad request 400: Date is too old".to_string()),
            ..RecordingUploader::default()
        };
        let sink = PvOutputSink::with_uploader("test", uploader);
        let reading = Reading::new(system(1_700_000_000), Vec::new());

        let err = sink.write(&reading).await.unwrap_err();
        assert_eq!(err.to_string(), "Bad request 400: Date is too old");
    }

    #[tokio::test]
    async fn http_uploader_sends_auth_headers_and_form() {
        let server = FakeServer::start(|_| (200, "OK 200: Added Status".to_string())).await;
        let url = format!("{}/service/r2/addstatus.jsp", server.url());
        let uploader = PvOutputHttpUploader::new("api-key", "4242", Some(&url), Duration::from_secs(5));

        uploader
            .add_status(status_params(&system(1_700_000_000), &Utc, Some(14.25)))
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.request_line, "POST /service/r2/addstatus.jsp HTTP/1.1");
        assert_eq!(request.header("x-pvoutput-apikey"), Some("api-key"));
        assert_eq!(request.header("x-pvoutput-systemid"), Some("4242"));
        assert_eq!(request.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(request.body, "d=20231114&t=22%3A13&v1=123456&v2=500&c1=1&v5=14.25");
    }

    #[tokio::test]
    async fn http_uploader_surfaces_response_body() {
        let server = FakeServer::start(|_| (400, "Bad request 400: Invalid System ID".to_string())).await;
        let uploader = PvOutputHttpUploader::new("api-key", "1", Some(&server.url()), Duration::from_secs(5));

        let err = uploader
            .add_status(status_params(&system(1_700_000_000), &Utc, None))
            .await
            .unwrap_err();

        assert!(matches!(err, WriteError::Backend(msg) if msg == "Bad request 400: Invalid System ID"));
    }
}
