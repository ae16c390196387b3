use backoff::backoff::Backoff;
use std::fmt::Display;
use std::future::Future;
use tracing::warn;

/// Runs `operation` up to `max_attempts` times, sleeping the policy's next
/// backoff between attempts. Returns the first success or the last error.
/// The attempt number (starting at 1) is passed to the operation.
pub async fn bounded<T, E, B, F, Fut>(
    max_attempts: u32,
    mut policy: B,
    mut operation: F,
) -> std::result::Result<T, E>
where
    E: Display,
    B: Backoff,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts => {
                let delay = policy.next_backoff().unwrap_or_default();
                warn!(
                    "attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, max_attempts, err, delay
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoff::backoff::Constant;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = bounded(3, Constant::new(Duration::ZERO), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err("not yet")
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausts_the_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = bounded(3, Constant::new(Duration::ZERO), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always") }
        })
        .await;

        assert_eq!(result, Err("always"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
