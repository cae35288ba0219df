//! InvestIQ services - market data, news and crypto behind fallback chains.
//!
//! Every provider call goes through the same plumbing:
//!
//! - **HTTP**: per-request timeouts and status handling ([`api::HttpClient`])
//! - **Cache**: time-to-live entries keyed per symbol or feed ([`api::TtlCache`])
//! - **Rate limiting**: fixed windows per provider ([`api::RateLimiter`])
//! - **Fallback**: sources tried in priority order until one returns data
//!   ([`api::fetch_with_fallback`])
//!
//! On top of that sit the [`services`] (stocks, news, crypto, analyst
//! ratings, the snapshot pipeline) and [`refresh::AutoRefresh`].

pub mod api;
pub mod config;
pub mod refresh;
pub mod rss;
pub mod services;

pub use config::Settings;

use std::time::Duration;

/// Error types for provider and pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed: {status} {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Missing API key for {0}")]
    MissingKey(&'static str),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("All data sources failed: {0}")]
    AllSourcesFailed(String),

    #[error(transparent)]
    Core(#[from] investiq_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Parse(e.to_string())
    }
}

/// Result type for provider and pipeline operations.
pub type Result<T> = std::result::Result<T, FeedError>;
