//! Log output setup.
//!
//! Sink outcomes (`sink_writes_total`, `sink_writes_skipped_total`,
//! `sink_write_errors_total`) and cycle attempts (`cycle_attempts_total`) are
//! recorded through the `metrics` facade. The binary runs a single cycle and
//! installs no recorder, so those counters are only collected when an
//! embedding program installs a `metrics` recorder before running a
//! [`crate::Cycle`].

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise this crate logs at info.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("envoy_reader=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
