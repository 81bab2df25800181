use anyhow::Result;
use envoy_reader::{
    config::AppConfig,
    observability,
    pipeline::{retry, Cycle, RetryPolicy, TelemetrySource},
    sinks, sources,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    if std::env::args().len() > 1 {
        tracing::warn!("arguments are ignored, envoy-reader is configured by its config file");
    }

    let cfg = AppConfig::load()?;
    let timeout = cfg.http_timeout();

    let gateway = sources::EnvoyGateway::new(&cfg.envoy.base_url, &cfg.envoy.username, &cfg.envoy.password, timeout);
    tracing::info!("use {}", gateway.describe());
    let telemetry: Arc<dyn TelemetrySource> = Arc::new(gateway);

    let weather = sources::weather_provider(cfg.weather.as_ref(), timeout);
    if let Some(provider) = &weather {
        tracing::info!("use weather {}", provider.describe());
    }

    let sinks = sinks::build_sinks(&cfg);
    for sink in &sinks {
        tracing::info!(sink = sink.name(), "use {}", sink.describe());
    }
    if sinks.is_empty() {
        tracing::warn!("no sinks configured");
    }

    let policy = RetryPolicy::from(&cfg.retry);
    let cycle = Cycle::new(telemetry, weather, sinks);

    let outcomes = retry(&policy, |attempt| {
        tracing::debug!(attempt, "starting cycle");
        cycle.run()
    })
    .await?;

    tracing::info!(sinks = outcomes.len(), "cycle complete");
    Ok(())
}
