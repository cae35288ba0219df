//! Shared fixtures for provider tests against a local mock server.

#![allow(dead_code)]

use investiq::config::CategoryFeed;
use investiq::services::Context;
use investiq::Settings;
use wiremock::MockServer;

/// Settings with every provider pointed at `server` and no pipeline delays.
pub fn settings_for(server: &MockServer) -> Settings {
    let uri = server.uri();
    let mut settings = Settings::default();

    let endpoints = &mut settings.endpoints;
    endpoints.finnhub = uri.clone();
    endpoints.alpha_vantage = uri.clone();
    endpoints.yahoo = uri.clone();
    endpoints.polygon = uri.clone();
    endpoints.twelve_data = uri.clone();
    endpoints.coingecko = uri.clone();
    endpoints.binance = uri.clone();
    endpoints.newsapi = uri.clone();
    endpoints.gnews = uri.clone();
    endpoints.currents = uri.clone();
    endpoints.bing_news = uri.clone();
    endpoints.rss_feeds = vec![format!("{}/rss/markets", uri)];
    endpoints.category_feeds = vec![
        CategoryFeed::new("Markets", &format!("{}/rss/markets", uri)),
        CategoryFeed::new("Crypto", &format!("{}/rss/crypto", uri)),
    ];

    settings.pipeline.batch_delay_ms = 0;
    settings.pipeline.chart_delay_ms = 0;
    settings.pipeline.rate_limit_backoff_secs = 0;
    settings.http.retry_base_ms = 0;
    settings.http.retry_jitter_ms = 0;
    settings
}

pub fn context(settings: Settings) -> Context {
    Context::new(settings).unwrap()
}

/// Yahoo chart payload with a price, previous close and three daily closes.
pub fn yahoo_chart(price: f64, previous_close: f64) -> serde_json::Value {
    serde_json::json!({
        "chart": {
            "result": [{
                "meta": {
                    "regularMarketPrice": price,
                    "chartPreviousClose": previous_close,
                    "regularMarketVolume": 52_000_000.0
                },
                "timestamp": [1736812800, 1736899200, 1736985600],
                "indicators": {
                    "quote": [{ "close": [previous_close, null, price] }]
                }
            }],
            "error": null
        }
    })
}

pub const MARKETS_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Market Wire</title>
    <item>
      <title>Stocks rally as inflation cools</title>
      <link>https://news.example.com/rally</link>
      <description>&lt;p&gt;Broad gains across sectors.&lt;/p&gt;</description>
      <pubDate>Tue, 14 Jan 2025 10:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Oil slips on demand worries</title>
      <link>https://news.example.com/oil</link>
      <description>Crude fell for a third day.</description>
      <pubDate>Tue, 14 Jan 2025 12:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Short</title>
      <link>https://news.example.com/short</link>
      <pubDate>Tue, 14 Jan 2025 13:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

pub const CRYPTO_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title></title>
    <item>
      <title>Bitcoin tops previous high</title>
      <link>https://news.example.com/btc</link>
      <pubDate>Tue, 14 Jan 2025 11:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Oil slips on demand worries</title>
      <link>https://news.example.com/oil-dup</link>
      <pubDate>Tue, 14 Jan 2025 09:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

/// CoinGecko `market_chart` with `days` daily points rising by one dollar.
pub fn market_chart(days: usize) -> serde_json::Value {
    let start_ms = 1_700_000_000_000_i64;
    let day_ms = 86_400_000_i64;
    let prices: Vec<[f64; 2]> = (0..days)
        .map(|i| [(start_ms + i as i64 * day_ms) as f64, 100.0 + i as f64])
        .collect();
    let volumes: Vec<[f64; 2]> = (0..days)
        .map(|i| [(start_ms + i as i64 * day_ms) as f64, 1_000_000.0])
        .collect();
    serde_json::json!({ "prices": prices, "total_volumes": volumes })
}
