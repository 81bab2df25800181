pub mod file;
pub mod influx;
pub mod pvoutput;

use std::sync::Arc;

pub use file::FileSink;
pub use influx::InfluxSink;
pub use pvoutput::PvOutputSink;

use crate::{config::AppConfig, pipeline::Sink};

/// Every sink with a section in `cfg`, in a fixed order. May be empty.
pub fn build_sinks(cfg: &AppConfig) -> Vec<Arc<dyn Sink>> {
    let timeout = cfg.http_timeout();
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

    if let Some(influx) = &cfg.influxdb {
        sinks.push(Arc::new(InfluxSink::new(&influx.url, &influx.database, timeout)));
    }
    if let Some(pv) = &cfg.pvoutput {
        sinks.push(Arc::new(PvOutputSink::new(&pv.api_key, &pv.system_id, pv.url.as_deref(), timeout)));
    }
    if let Some(file) = &cfg.file_output {
        sinks.push(Arc::new(FileSink::new(&file.path)));
    }

    sinks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_sink_per_section() {
        let cfg = AppConfig::parse(
            r#"
            [envoy]
            base_url = "http://envoy.local"
            username = "envoy"

            [influxdb]
            url = "http://localhost:8086"
            database = "solar"

            [file_output]
            path = "envoy.log"
            "#,
        )
        .unwrap();

        let names: Vec<String> = build_sinks(&cfg).iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["influxdb", "file"]);
    }

    #[test]
    fn no_sections_means_no_sinks() {
        let cfg = AppConfig::parse("[envoy]\nbase_url = \"http://e\"\nusername = \"u\"\n").unwrap();
        assert!(build_sinks(&cfg).is_empty());
    }
}
