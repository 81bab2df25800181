use serde::Deserialize;
use std::{fs, time::Duration};

use crate::{pipeline::RetryPolicy, sources::buienradar::DEFAULT_STATION_ID};

#[derive(Debug, Clone, Deserialize)]
pub struct EnvoyConfig {
    pub base_url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_retry_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy {
            interval: Duration::from_millis(cfg.interval_ms),
            max_attempts: cfg.max_attempts,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    pub url: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PvOutputConfig {
    #[serde(default)]
    pub api_key: String,
    pub system_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileOutputConfig {
    /// May contain `{date}`, replaced by the local date as `yyyyMMdd`.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenWeatherMapConfig {
    #[serde(default)]
    pub api_key: String,
    pub lat: f64,
    pub lon: f64,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuienradarConfig {
    #[serde(default = "default_station_id")]
    pub station_id: i64,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherConfig {
    pub openweathermap: Option<OpenWeatherMapConfig>,
    pub buienradar: Option<BuienradarConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub envoy: EnvoyConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    pub influxdb: Option<InfluxConfig>,
    pub pvoutput: Option<PvOutputConfig>,
    pub file_output: Option<FileOutputConfig>,
    pub weather: Option<WeatherConfig>,
}

fn default_retry_interval_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    50
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_station_id() -> i64 {
    DEFAULT_STATION_ID
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ENVOY_READER_CONFIG").unwrap_or_else(|_| "envoy-reader.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("could not read config file {path}: {e}"))?;
        let mut cfg = Self::parse(&contents)?;
        cfg.apply_env_overrides(|key| env::var(key).ok());
        Ok(cfg)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    /// Secrets may be kept out of the config file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = lookup("ENVOY_PASSWORD") {
            self.envoy.password = password;
        }
        if let (Some(key), Some(pvoutput)) = (lookup("PVOUTPUT_API_KEY"), self.pvoutput.as_mut()) {
            pvoutput.api_key = key;
        }
        if let Some(key) = lookup("OPENWEATHERMAP_API_KEY") {
            if let Some(owm) = self.weather.as_mut().and_then(|w| w.openweathermap.as_mut()) {
                owm.api_key = key;
            }
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
