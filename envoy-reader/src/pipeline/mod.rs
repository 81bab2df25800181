use std::sync::Arc;

use envoy_client::{InverterRecord, SystemReading};
use tokio::sync::OnceCell;

mod dispatch;
mod retry;

pub use dispatch::dispatch;
pub use retry::{retry, RetryPolicy};

#[derive(thiserror::Error, Debug, Clone)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(String),
    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("missing data: {0}")]
    MissingData(String),
    #[error("weather station {0} not found in current measurements")]
    StationNotFound(i64),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(e.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// Diagnostic text reported by the backend, kept verbatim.
    #[error("{0}")]
    Backend(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for WriteError {
    fn from(e: reqwest::Error) -> Self {
        WriteError::Http(e.to_string())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("sink {sink} failed: {source}")]
    Write { sink: String, source: WriteError },
    #[error("no sinks configured")]
    NoSinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    NotNeeded,
}

/// Everything fetched during one cycle, shared read-only by all sinks.
///
/// The ambient temperature is looked up lazily, at most once, the first
/// time a sink asks for it. A new `Reading` is built for every attempt.
pub struct Reading {
    pub system: SystemReading,
    pub inverters: Vec<InverterRecord>,
    weather: Option<Arc<dyn WeatherProvider>>,
    temperature: OnceCell<Result<f64, FetchError>>,
}

impl Reading {
    pub fn new(system: SystemReading, inverters: Vec<InverterRecord>) -> Self {
        Self {
            system,
            inverters,
            weather: None,
            temperature: OnceCell::new(),
        }
    }

    pub fn with_weather(mut self, provider: Option<Arc<dyn WeatherProvider>>) -> Self {
        self.weather = provider;
        self
    }

    /// `None` when no weather provider is configured for this run.
    pub async fn temperature(&self) -> Option<Result<f64, FetchError>> {
        let provider = self.weather.as_ref()?;
        let result = self
            .temperature
            .get_or_init(|| async move { provider.current_temperature().await })
            .await;
        Some(result.clone())
    }
}

#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Production summaries of the inverter class.
    async fn fetch_system_readings(&self) -> Result<Vec<SystemReading>, FetchError>;

    /// Per-inverter production joined with the device inventory.
    async fn fetch_inverter_records(&self) -> Result<Vec<InverterRecord>, FetchError>;
}

#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    fn describe(&self) -> String;

    /// Current ambient temperature in degrees Celsius.
    async fn current_temperature(&self) -> Result<f64, FetchError>;
}

#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    fn name(&self) -> &str;

    /// One-line description logged once at startup.
    fn describe(&self) -> String;

    async fn write(&self, reading: &Reading) -> Result<WriteOutcome, WriteError>;
}

/// One fetch, enrich and dispatch pass.
pub struct Cycle {
    telemetry: Arc<dyn TelemetrySource>,
    weather: Option<Arc<dyn WeatherProvider>>,
    sinks: Vec<Arc<dyn Sink>>,
}

impl Cycle {
    pub fn new(
        telemetry: Arc<dyn TelemetrySource>,
        weather: Option<Arc<dyn WeatherProvider>>,
        sinks: Vec<Arc<dyn Sink>>,
    ) -> Self {
        Self {
            telemetry,
            weather,
            sinks,
        }
    }

    pub async fn run(&self) -> Result<Vec<(String, WriteOutcome)>, CycleError> {
        let (systems, inverters) = tokio::try_join!(
            self.telemetry.fetch_system_readings(),
            self.telemetry.fetch_inverter_records()
        )?;

        let system = crate::transform::select_system_reading(systems)?;
        crate::transform::log_reading(&system, &inverters);

        let reading = Reading::new(system, inverters).with_weather(self.weather.clone());
        dispatch(&reading, &self.sinks).await
    }
}
