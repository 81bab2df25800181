use std::sync::Arc;

use futures::future::join_all;

use super::{CycleError, Reading, Sink, WriteOutcome};

/// Write `reading` to every sink concurrently and wait for all of them.
///
/// A failing sink does not stop or cancel the others. Once every sink has
/// finished, the first failure (in configuration order) is returned; writes
/// already committed by other sinks stay in place.
pub async fn dispatch(reading: &Reading, sinks: &[Arc<dyn Sink>]) -> Result<Vec<(String, WriteOutcome)>, CycleError> {
    if sinks.is_empty() {
        return Err(CycleError::NoSinks);
    }

    let results = join_all(sinks.iter().map(|sink| async move {
        let result = sink.write(reading).await;
        (sink.name().to_string(), result)
    }))
    .await;

    let mut outcomes = Vec::with_capacity(results.len());
    let mut first_error = None;

    for (name, result) in results {
        match result {
            Ok(outcome) => {
                match outcome {
                    WriteOutcome::Written => {
                        tracing::info!(sink = %name, "written successfully");
                        metrics::counter!("sink_writes_total").increment(1);
                    }
                    WriteOutcome::NotNeeded => {
                        tracing::info!(sink = %name, "no need to write");
                        metrics::counter!("sink_writes_skipped_total").increment(1);
                    }
                }
                outcomes.push((name, outcome));
            }
            Err(e) => {
                tracing::error!(sink = %name, error = %e, "sink write failed");
                metrics::counter!("sink_write_errors_total").increment(1);
                if first_error.is_none() {
                    first_error = Some(CycleError::Write { sink: name, source: e });
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(outcomes),
    }
}
