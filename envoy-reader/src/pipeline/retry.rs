use std::{future::Future, time::Duration};

/// Fixed-interval retry of a whole cycle.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 50,
        }
    }
}

/// Run `op` until it succeeds or `max_attempts` calls have failed.
///
/// `op` receives the 1-based attempt number. The interval is only slept
/// between attempts; the error of the final attempt is returned as is.
/// A policy with `max_attempts == 0` still makes one attempt.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        metrics::counter!("cycle_attempts_total").increment(1);

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    "cycle failed, retrying after {:?}",
                    policy.interval
                );
                tokio::time::sleep(policy.interval).await;
            }
            Err(e) => {
                tracing::error!(error = %e, attempt, "cycle failed, giving up");
                return Err(e);
            }
        }
    }
}
