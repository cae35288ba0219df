mod common;

use approx::assert_relative_eq;
use investiq::services::{RatingsService, SnapshotPipeline};
use investiq::FeedError;
use investiq_core::MarketSnapshot;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{context, market_chart, settings_for, yahoo_chart, MARKETS_RSS};

fn ibm_overview() -> serde_json::Value {
    json!({
        "Symbol": "IBM",
        "Name": "International Business Machines",
        "Sector": "TECHNOLOGY",
        "MarketCapitalization": "172000000000",
        "PERatio": "22.5",
        "ProfitMargin": "0.184",
        "ReturnOnEquityTTM": "0.32",
        "AnalystTargetPrice": "220",
        "50DayMovingAverage": "185.2",
        "200DayMovingAverage": "170.1"
    })
}

#[tokio::test]
async fn test_overview_maps_fundamentals_and_ratings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("function", "OVERVIEW"))
        .and(query_param("symbol", "IBM"))
        .and(query_param("apikey", "av-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ibm_overview()))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.alpha_vantage = Some("av-key".to_string());
    let service = RatingsService::new(context(settings));

    let profile = service.fetch_overview("ibm").await.unwrap();
    assert_eq!(profile.symbol, "IBM");
    assert_eq!(profile.fundamentals.sector.as_deref(), Some("TECHNOLOGY"));
    assert_relative_eq!(profile.fundamentals.roce.unwrap(), 32.0);

    let ratings = service.analyst_ratings("IBM").await.unwrap();
    assert_eq!(ratings.buy + ratings.hold + ratings.sell, 100);
}

#[tokio::test]
async fn test_overview_rate_limit_note() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Information": "Daily request limit reached."
        })))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.alpha_vantage = Some("av-key".to_string());
    let service = RatingsService::new(context(settings));

    assert!(matches!(
        service.fetch_overview("IBM").await,
        Err(FeedError::RateLimited(_))
    ));
    assert!(service.analyst_ratings("IBM").await.is_none());
}

#[tokio::test]
async fn test_ratings_need_a_key() {
    let server = MockServer::start().await;
    let service = RatingsService::new(context(settings_for(&server)));

    assert!(!service.is_configured());
    assert!(matches!(
        service.fetch_overview("IBM").await,
        Err(FeedError::MissingKey(_))
    ));
    assert!(service.analyst_ratings("IBM").await.is_none());
}

#[tokio::test]
async fn test_snapshot_generate_and_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(190.5, 188.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/MSFT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(410.0, 400.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v8/finance/chart/[A-Z]+\.NS$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(2950.0, 2900.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/coins/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "current_price": 65000.0,
            "price_change_percentage_24h": -0.8
        }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/coins/bitcoin/market_chart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(market_chart(60)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss/markets"))
        .respond_with(ResponseTemplate::new(200).set_body_string(MARKETS_RSS))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out = dir.path().join("latest_data.json");

    let mut settings = settings_for(&server);
    settings.pipeline.india_limit = 1;
    settings.pipeline.us_limit = 2;
    settings.pipeline.crypto_ids = vec!["bitcoin".to_string()];
    settings.pipeline.snapshot_path = Some(out.clone());
    let pipeline = SnapshotPipeline::new(context(settings));

    let snapshot = pipeline.generate_and_write().await.unwrap();
    assert_eq!(snapshot.nifty_50.len(), 1);
    assert_eq!(snapshot.nifty_50[0].symbol, "RELIANCE");
    assert_eq!(snapshot.us_stocks.len(), 2);
    assert!(snapshot.us_stocks[0].score >= snapshot.us_stocks[1].score);
    assert_eq!(snapshot.us_stocks[0].history.len(), 2);
    assert_eq!(snapshot.crypto.len(), 1);
    assert_eq!(snapshot.news.len(), 2);

    let written: MarketSnapshot =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written.us_stocks.len(), 2);
    assert_eq!(written.crypto[0].id, "bitcoin");

    let loaded = pipeline.load(&format!("{}/missing.json", server.uri())).await;
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_snapshot_load_from_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/latest_data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "last_updated": "2025-01-14T15:30:00Z",
            "crypto": []
        })))
        .mount(&server)
        .await;

    let pipeline = SnapshotPipeline::new(context(settings_for(&server)));
    let snapshot = pipeline
        .load(&format!("{}/latest_data.json", server.uri()))
        .await;

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.last_updated.to_rfc3339(), "2025-01-14T15:30:00+00:00");
}
