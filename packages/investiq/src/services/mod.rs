//! Market data, news, crypto and ratings services.
//!
//! Every service shares one [`Context`]: the HTTP client, the settings and
//! the per-provider rate limiter.

pub mod crypto;
pub mod news;
pub mod ratings;
pub mod snapshot;
pub mod stocks;

pub use crypto::CryptoService;
pub use news::NewsService;
pub use ratings::RatingsService;
pub use snapshot::SnapshotPipeline;
pub use stocks::{HistoryRange, StockService};

use std::sync::Arc;
use std::time::Duration;

use crate::api::{HttpClient, RateLimiter};
use crate::config::Settings;
use crate::{FeedError, Result};

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(86_400);

/// Calls allowed per window for one provider.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub key: &'static str,
    pub max: u32,
    pub window: Duration,
}

pub const FINNHUB_LIMIT: RateLimit = RateLimit { key: "finnhub", max: 60, window: MINUTE };
pub const ALPHA_VANTAGE_LIMIT: RateLimit = RateLimit { key: "alphavantage", max: 5, window: MINUTE };
pub const POLYGON_LIMIT: RateLimit = RateLimit { key: "polygon", max: 5, window: MINUTE };
pub const TWELVE_DATA_LIMIT: RateLimit = RateLimit { key: "twelvedata", max: 8, window: MINUTE };
pub const NEWSAPI_LIMIT: RateLimit = RateLimit { key: "newsapi", max: 100, window: DAY };
pub const GNEWS_LIMIT: RateLimit = RateLimit { key: "gnews", max: 100, window: DAY };
pub const CURRENTS_LIMIT: RateLimit = RateLimit { key: "currents", max: 600, window: DAY };

/// Shared handles for all services.
#[derive(Clone)]
pub struct Context {
    pub http: HttpClient,
    pub settings: Arc<Settings>,
    pub limiter: Arc<RateLimiter>,
}

impl Context {
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(&settings.http)?,
            settings: Arc::new(settings),
            limiter: Arc::new(RateLimiter::new()),
        })
    }

    /// Wait for a slot under `limit`.
    pub async fn throttle(&self, limit: RateLimit) {
        self.limiter
            .wait_for_slot(limit.key, limit.max, limit.window)
            .await;
    }
}

/// The configured key, or `MissingKey` naming the provider.
pub(crate) fn require_key(key: &Option<String>, provider: &'static str) -> Result<String> {
    key.clone().ok_or(FeedError::MissingKey(provider))
}

/// Parse a numeric string as providers send them (`"1.25%"`, `"None"`, `"-"`).
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .trim_end_matches('%')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}
