use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::{future::retry_notify, ExponentialBackoff};

/// Retry an async operation with exponential backoff until it succeeds or
/// `max_elapsed` has passed. Every error is treated as transient.
///
/// A zero `max_elapsed` runs the operation exactly once.
pub async fn backoff_retry<F, Fut, T, E>(max_elapsed: Duration, mut fn_to_try: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    if max_elapsed.is_zero() {
        return fn_to_try().await;
    }

    let policy = ExponentialBackoff {
        initial_interval: Duration::from_millis(200),
        max_interval: Duration::from_secs(2),
        max_elapsed_time: Some(max_elapsed),
        ..ExponentialBackoff::default()
    };
    let notify = |err: E, dur: Duration| {
        log::warn!(
            "Temporary error, retrying in {:.1}s: {}",
            dur.as_secs_f32(),
            err
        );
    };

    retry_notify(
        policy,
        || {
            let attempt = fn_to_try();
            async move { attempt.await.map_err(backoff::Error::transient) }
        },
        notify,
    )
    .await
}
