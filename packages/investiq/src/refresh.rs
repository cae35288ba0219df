//! Visibility-aware auto refresh.
//!
//! Ticks every `interval` while the view is visible. Hidden views get no
//! ticks; when the view comes back and the data is older than `interval`,
//! one refresh runs straight away and the normal cadence resumes from there.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

use crate::config::RefreshSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoRefresh {
    interval: Duration,
    enabled: bool,
}

impl AutoRefresh {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: true,
        }
    }

    pub fn from_settings(settings: &RefreshSettings) -> Self {
        Self {
            interval: Duration::from_secs(settings.interval_secs.max(1)),
            enabled: settings.enabled,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drive `on_refresh` until the visibility sender is dropped.
    ///
    /// `visibility` carries `true` while the view is shown. Returns at once
    /// when refresh is disabled.
    pub async fn run<F, Fut>(&self, mut visibility: watch::Receiver<bool>, mut on_refresh: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        if !self.enabled {
            tracing::debug!("Auto refresh disabled");
            return;
        }

        let mut last = Instant::now();
        loop {
            let visible = *visibility.borrow_and_update();

            if visible {
                tokio::select! {
                    _ = sleep_until(last + self.interval) => {
                        on_refresh().await;
                        last = Instant::now();
                    }
                    changed = visibility.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                continue;
            }

            if visibility.changed().await.is_err() {
                break;
            }
            if *visibility.borrow() && last.elapsed() > self.interval {
                tracing::debug!("Visible again after {:?}, refreshing", last.elapsed());
                on_refresh().await;
                last = Instant::now();
            }
        }

        tracing::debug!("Auto refresh stopped");
    }
}
