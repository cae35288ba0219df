//! Retry with exponential backoff and jitter

use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `attempts` times. The wait before retry `i` is
/// `base * 2^i` plus a random jitter below `jitter`. The last error is returned.
pub async fn with_retry<T, E, F, Fut>(
    attempts: u32,
    base: Duration,
    jitter: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = backoff(base, jitter, attempt);
                tracing::debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn backoff(base: Duration, jitter: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt));
    let jitter_ms = jitter.as_millis() as u64;
    let extra = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..jitter_ms)
    };
    exp + Duration::from_millis(extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result: Result<u32, String> = with_retry(
            3,
            Duration::from_millis(500),
            Duration::ZERO,
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(format!("attempt {} failed", n))
                } else {
                    Ok(n)
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // 500ms + 1000ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_without_trailing_sleep() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let start = Instant::now();

        let result: Result<(), String> = with_retry(
            2,
            Duration::from_millis(100),
            Duration::ZERO,
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure {}", n))
            },
        )
        .await;

        assert_eq!(result, Err("failure 1".to_string()));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        for attempt in 0..3 {
            let delay = backoff(Duration::from_millis(500), Duration::from_millis(200), attempt);
            let floor = Duration::from_millis(500 * 2u64.pow(attempt));
            assert!(delay >= floor);
            assert!(delay < floor + Duration::from_millis(200));
        }
    }
}
