//! Provider plumbing shared by every service.

pub mod cache;
pub mod fallback;
pub mod http;
pub mod rate_limit;
pub mod retry;

pub use cache::TtlCache;
pub use fallback::{fetch_with_fallback, Fetched, Source};
pub use http::HttpClient;
pub use rate_limit::RateLimiter;
pub use retry::with_retry;
