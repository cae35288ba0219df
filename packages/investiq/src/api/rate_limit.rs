//! Fixed-window rate limiting per provider

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

struct Window {
    count: u32,
    resets_at: Instant,
}

/// Counts calls per key inside a fixed window.
#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one call for `key` if fewer than `max` were made in the current window.
    pub fn check(&self, key: &str, max: u32, window: Duration) -> bool {
        let now = Instant::now();
        let Ok(mut windows) = self.windows.lock() else {
            return true;
        };

        match windows.get_mut(key) {
            Some(w) if now <= w.resets_at => {
                if w.count < max {
                    w.count += 1;
                    true
                } else {
                    false
                }
            }
            _ => {
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        resets_at: now + window,
                    },
                );
                true
            }
        }
    }

    /// Wait until a call for `key` is admitted, re-checking every second.
    pub async fn wait_for_slot(&self, key: &str, max: u32, window: Duration) {
        while !self.check(key, max, window) {
            tracing::debug!("Rate limit reached for {}, waiting", key);
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_max() {
        let limiter = RateLimiter::new();

        for _ in 0..5 {
            assert!(limiter.check("alphavantage", 5, MINUTE));
        }
        assert!(!limiter.check("alphavantage", 5, MINUTE));
        assert!(limiter.check("finnhub", 60, MINUTE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("polygon", 1, MINUTE));
        assert!(!limiter.check("polygon", 1, MINUTE));

        tokio::time::advance(MINUTE + Duration::from_millis(1)).await;
        assert!(limiter.check("polygon", 1, MINUTE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_slot_blocks_until_reset() {
        let limiter = RateLimiter::new();
        limiter.check("twelvedata", 1, Duration::from_secs(3));

        let start = Instant::now();
        limiter
            .wait_for_slot("twelvedata", 1, Duration::from_secs(3))
            .await;

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(3));
        assert!(waited <= Duration::from_secs(5));
    }
}
