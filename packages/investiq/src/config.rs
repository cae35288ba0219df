//! Settings loaded from `config.toml` with environment overrides.
//!
//! Lookup order for the file: an explicit path, then `INVESTIQ_CONFIG`, then
//! `<config dir>/investiq/config.toml`. A missing file yields defaults.
//!
//! ```toml
//! [api_keys]
//! finnhub = "..."
//! alpha_vantage = "..."
//!
//! [cache]
//! quote_ttl_secs = 60
//! news_ttl_secs = 300
//!
//! [pipeline]
//! india_limit = 30
//! us_limit = 28
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use investiq_core::store::JsonFileStore;

use crate::{FeedError, Result};

/// Environment variable pointing at the config file.
pub const CONFIG_ENV: &str = "INVESTIQ_CONFIG";
/// Environment variable overriding the snapshot path.
pub const SNAPSHOT_PATH_ENV: &str = "INVESTIQ_SNAPSHOT_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_keys: ApiKeys,
    pub http: HttpSettings,
    pub cache: CacheSettings,
    pub pipeline: PipelineSettings,
    pub refresh: RefreshSettings,
    pub endpoints: Endpoints,
    /// Directory for favorites, alerts and portfolio files
    pub data_dir: Option<PathBuf>,
}

/// Provider API keys. Providers without a key are left out of fallback chains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub finnhub: Option<String>,
    pub alpha_vantage: Option<String>,
    pub polygon: Option<String>,
    pub twelve_data: Option<String>,
    pub newsapi: Option<String>,
    pub gnews: Option<String>,
    pub currents: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Attempts for single-source requests such as chart history
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
    pub retry_jitter_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("investiq/{}", env!("CARGO_PKG_VERSION")),
            retry_attempts: 3,
            retry_base_ms: 500,
            retry_jitter_ms: 250,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn retry_jitter(&self) -> Duration {
        Duration::from_millis(self.retry_jitter_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub quote_ttl_secs: u64,
    pub news_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            quote_ttl_secs: 60,
            news_ttl_secs: 300,
        }
    }
}

impl CacheSettings {
    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_ttl_secs)
    }

    pub fn news_ttl(&self) -> Duration {
        Duration::from_secs(self.news_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Nifty 50 constituents included in the snapshot
    pub india_limit: usize,
    /// US large caps included in the snapshot
    pub us_limit: usize,
    /// CoinGecko ids ranked in the snapshot
    pub crypto_ids: Vec<String>,
    pub crypto_batch_size: usize,
    pub batch_delay_ms: u64,
    /// Pause before each market chart request
    pub chart_delay_ms: u64,
    /// Wait after a 429 before the single retry
    pub rate_limit_backoff_secs: u64,
    pub chart_days: u32,
    /// Daily points kept as chart history
    pub history_points: usize,
    pub news_limit: usize,
    pub news_per_feed: usize,
    /// Where `snapshot generate` writes; defaults to `<data dir>/latest_data.json`
    pub snapshot_path: Option<PathBuf>,
    /// Path or URL `snapshot show` reads; defaults to `snapshot_path`
    pub snapshot_source: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            india_limit: 30,
            us_limit: 28,
            crypto_ids: [
                "bitcoin",
                "ethereum",
                "tether",
                "binancecoin",
                "solana",
                "ripple",
                "usd-coin",
                "cardano",
                "avalanche-2",
                "dogecoin",
                "polkadot",
                "matic-network",
                "chainlink",
                "litecoin",
                "bitcoin-cash",
                "uniswap",
                "stellar",
                "monero",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            crypto_batch_size: 5,
            batch_delay_ms: 2000,
            chart_delay_ms: 1200,
            rate_limit_backoff_secs: 10,
            chart_days: 200,
            history_points: 90,
            news_limit: 50,
            news_per_feed: 3,
            snapshot_path: None,
            snapshot_source: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

/// A category and the RSS feed that serves it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryFeed {
    pub category: String,
    pub url: String,
}

impl CategoryFeed {
    pub fn new(category: &str, url: &str) -> Self {
        Self {
            category: category.to_string(),
            url: url.to_string(),
        }
    }
}

/// Base URLs of every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub finnhub: String,
    pub alpha_vantage: String,
    pub yahoo: String,
    pub polygon: String,
    pub twelve_data: String,
    pub coingecko: String,
    pub binance: String,
    pub newsapi: String,
    pub gnews: String,
    pub currents: String,
    pub bing_news: String,
    /// Headline feeds merged by the news chain
    pub rss_feeds: Vec<String>,
    /// Feeds aggregated into the snapshot's news section
    pub category_feeds: Vec<CategoryFeed>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            finnhub: "https://finnhub.io/api/v1".to_string(),
            alpha_vantage: "https://www.alphavantage.co".to_string(),
            yahoo: "https://query1.finance.yahoo.com".to_string(),
            polygon: "https://api.polygon.io".to_string(),
            twelve_data: "https://api.twelvedata.com".to_string(),
            coingecko: "https://api.coingecko.com/api/v3".to_string(),
            binance: "https://api.binance.com".to_string(),
            newsapi: "https://newsapi.org".to_string(),
            gnews: "https://gnews.io".to_string(),
            currents: "https://api.currentsapi.services".to_string(),
            bing_news: "https://www.bing.com".to_string(),
            rss_feeds: [
                "https://feeds.bloomberg.com/markets/news.rss",
                "https://www.reuters.com/rssFeed/businessNews",
                "https://finance.yahoo.com/news/rssindex",
                "https://www.cnbc.com/id/10001147/device/rss/rss.html",
                "https://www.ft.com/rss/home/us",
                "https://www.coindesk.com/arc/outboundfeeds/rss/",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            category_feeds: vec![
                CategoryFeed::new(
                    "Markets",
                    "https://search.cnbc.com/rs/search/combinedcms/view.xml?partnerId=wrss01&id=10000664",
                ),
                CategoryFeed::new("Markets", "https://www.marketwatch.com/rss/topstories"),
                CategoryFeed::new(
                    "Economy",
                    "https://economictimes.indiatimes.com/rssfeedstopstories.cms",
                ),
                CategoryFeed::new("Technology", "https://techcrunch.com/feed/"),
                CategoryFeed::new("Technology", "https://www.theverge.com/rss/index.xml"),
                CategoryFeed::new("Crypto", "https://cointelegraph.com/rss"),
                CategoryFeed::new("Crypto", "https://www.coindesk.com/arc/outboundfeeds/rss/"),
                CategoryFeed::new("Business", "http://feeds.bbci.co.uk/news/business/rss.xml"),
                CategoryFeed::new("Business", "https://feeds.bloomberg.com/markets/news.rss"),
                CategoryFeed::new("World", "http://feeds.bbci.co.uk/news/world/rss.xml"),
            ],
        }
    }
}

impl Settings {
    /// Load settings from `path`, `INVESTIQ_CONFIG` or the default location,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => env::var(CONFIG_ENV)
                .ok()
                .map(PathBuf::from)
                .or_else(Self::default_path),
        };

        let mut settings = match path {
            Some(ref p) if p.exists() => {
                tracing::debug!("Loading settings from {}", p.display());
                Self::from_toml_str(&fs::read_to_string(p)?)?
            }
            _ => Self::default(),
        };

        settings.apply_env(|key| env::var(key).ok());
        Ok(settings)
    }

    /// `<config dir>/investiq/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("investiq/config.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FeedError::Config(e.to_string()))
    }

    /// Apply `INVESTIQ_<PROVIDER>_API_KEY`, `INVESTIQ_DATA_DIR` and
    /// `INVESTIQ_SNAPSHOT_PATH` from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let keys = &mut self.api_keys;
        let slots: [(&str, &mut Option<String>); 7] = [
            ("INVESTIQ_FINNHUB_API_KEY", &mut keys.finnhub),
            ("INVESTIQ_ALPHA_VANTAGE_API_KEY", &mut keys.alpha_vantage),
            ("INVESTIQ_POLYGON_API_KEY", &mut keys.polygon),
            ("INVESTIQ_TWELVE_DATA_API_KEY", &mut keys.twelve_data),
            ("INVESTIQ_NEWSAPI_API_KEY", &mut keys.newsapi),
            ("INVESTIQ_GNEWS_API_KEY", &mut keys.gnews),
            ("INVESTIQ_CURRENTS_API_KEY", &mut keys.currents),
        ];
        for (var, slot) in slots {
            if let Some(value) = lookup(var) {
                *slot = Some(value);
            }
        }

        if let Some(dir) = lookup(investiq_core::store::DATA_DIR_ENV) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = lookup(SNAPSHOT_PATH_ENV) {
            self.pipeline.snapshot_path = Some(PathBuf::from(path));
        }

        self.api_keys.drop_blank();
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(JsonFileStore::default_dir)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.pipeline
            .snapshot_path
            .clone()
            .unwrap_or_else(|| self.data_dir().join("latest_data.json"))
    }

    /// Path or URL the snapshot is read from.
    pub fn snapshot_source(&self) -> String {
        self.pipeline
            .snapshot_source
            .clone()
            .unwrap_or_else(|| self.snapshot_path().display().to_string())
    }
}

impl ApiKeys {
    fn drop_blank(&mut self) {
        for slot in [
            &mut self.finnhub,
            &mut self.alpha_vantage,
            &mut self.polygon,
            &mut self.twelve_data,
            &mut self.newsapi,
            &mut self.gnews,
            &mut self.currents,
        ] {
            if slot.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.http.timeout(), Duration::from_secs(10));
        assert_eq!(settings.cache.quote_ttl(), Duration::from_secs(60));
        assert_eq!(settings.cache.news_ttl(), Duration::from_secs(300));
        assert_eq!(settings.pipeline.crypto_ids.len(), 18);
        assert_eq!(settings.endpoints.rss_feeds.len(), 6);
        assert!(settings.api_keys.finnhub.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            data_dir = "/tmp/investiq"

            [api_keys]
            finnhub = "fh-key"

            [pipeline]
            us_limit = 5

            [endpoints]
            yahoo = "http://localhost:9000"
            "#,
        )
        .unwrap();

        assert_eq!(settings.api_keys.finnhub.as_deref(), Some("fh-key"));
        assert_eq!(settings.pipeline.us_limit, 5);
        assert_eq!(settings.pipeline.india_limit, 30);
        assert_eq!(settings.endpoints.yahoo, "http://localhost:9000");
        assert_eq!(settings.endpoints.finnhub, "https://finnhub.io/api/v1");
        assert_eq!(
            settings.snapshot_path(),
            PathBuf::from("/tmp/investiq/latest_data.json")
        );
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Settings::from_toml_str("[http]\ntimeout_secs = \"soon\""),
            Err(FeedError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INVESTIQ_ALPHA_VANTAGE_API_KEY", "av-key"),
            ("INVESTIQ_GNEWS_API_KEY", "  "),
            ("INVESTIQ_DATA_DIR", "/data"),
            ("INVESTIQ_SNAPSHOT_PATH", "/snap.json"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api_keys.alpha_vantage.as_deref(), Some("av-key"));
        assert!(settings.api_keys.gnews.is_none());
        assert_eq!(settings.data_dir(), PathBuf::from("/data"));
        assert_eq!(settings.snapshot_path(), PathBuf::from("/snap.json"));
        assert_eq!(settings.snapshot_source(), "/snap.json");
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nquote_ttl_secs = 5\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.cache.quote_ttl_secs, 5);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(settings.cache.news_ttl_secs, 300);
    }
}
