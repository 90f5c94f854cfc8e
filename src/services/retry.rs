// src/services/retry.rs
use crate::errors::PredictorError;
use log::warn;
use std::future::Future;
use std::time::Duration;

/// Retry an async operation with exponential backoff. `retries` is the number
/// of additional attempts after the first; delays double starting from
/// `base_delay`. The predicate decides whether a given error is worth
/// retrying at all.
pub async fn retry_with_backoff<T, F, Fut, P>(
    retries: u32,
    base_delay: Duration,
    is_retryable: P,
    mut op: F,
) -> Result<T, PredictorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PredictorError>>,
    P: Fn(&PredictorError) -> bool,
{
    let mut delay = base_delay;
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < retries && is_retryable(&err) => {
                attempt += 1;
                warn!(
                    "attempt {} failed, retrying in {:?}: {}",
                    attempt, delay, err
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
}
