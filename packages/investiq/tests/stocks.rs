mod common;

use approx::assert_relative_eq;
use investiq::services::{HistoryRange, StockService};
use investiq::FeedError;
use investiq_core::Market;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{context, settings_for, yahoo_chart};

#[tokio::test]
async fn test_finnhub_failure_falls_back_to_yahoo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(190.5, 188.0)))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.finnhub = Some("test-key".to_string());
    let service = StockService::new(context(settings));

    let quote = service.fetch_quote("aapl", Market::Us).await.unwrap();
    assert_eq!(quote.symbol, "AAPL");
    assert_eq!(quote.source, "Yahoo Finance");
    assert_relative_eq!(quote.price, 190.5);
    assert_relative_eq!(quote.change, 2.5);
    assert_relative_eq!(quote.change_percent, 2.5 / 188.0 * 100.0);
}

#[tokio::test]
async fn test_finnhub_quote_is_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .and(query_param("symbol", "MSFT"))
        .and(query_param("token", "test-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "c": 410.2, "d": -1.3, "dp": -0.32 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.finnhub = Some("test-key".to_string());
    let service = StockService::new(context(settings));

    let first = service.fetch_quote("MSFT", Market::Us).await.unwrap();
    let second = service.fetch_quote("MSFT", Market::Us).await.unwrap();

    assert_eq!(first.source, "Finnhub");
    assert_eq!(first, second);
    assert_relative_eq!(first.change_percent, -0.32);
}

#[tokio::test]
async fn test_alpha_vantage_rate_limit_note_falls_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .and(query_param("function", "GLOBAL_QUOTE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/NVDA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(131.0, 130.0)))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.alpha_vantage = Some("av-key".to_string());
    let service = StockService::new(context(settings));

    let quote = service.fetch_quote("NVDA", Market::Us).await.unwrap();
    assert_eq!(quote.source, "Yahoo Finance");
}

#[tokio::test]
async fn test_india_quotes_use_nse_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/RELIANCE.NS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(2950.0, 2900.0)))
        .mount(&server)
        .await;

    let service = StockService::new(context(settings_for(&server)));
    let quote = service.fetch_quote("RELIANCE", Market::India).await.unwrap();

    assert_eq!(quote.symbol, "RELIANCE");
    assert_relative_eq!(quote.price, 2950.0);
}

#[tokio::test]
async fn test_every_source_failing_reports_each() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.finnhub = Some("test-key".to_string());
    let service = StockService::new(context(settings));

    match service.fetch_quote("TSLA", Market::Us).await {
        Err(FeedError::AllSourcesFailed(detail)) => {
            assert!(detail.contains("Finnhub"));
            assert!(detail.contains("Yahoo Finance"));
        }
        other => panic!("expected AllSourcesFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_history_skips_missing_closes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .and(query_param("range", "6mo"))
        .and(query_param("interval", "1d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(190.5, 188.0)))
        .mount(&server)
        .await;

    let service = StockService::new(context(settings_for(&server)));
    let history = service
        .fetch_history("AAPL", Market::Us, HistoryRange::SixMonths)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].time, "2025-01-14");
    assert_relative_eq!(history[1].value, 190.5);

    let analysis = service
        .analyze("AAPL", Market::Us, HistoryRange::SixMonths)
        .await
        .unwrap();
    assert_eq!(analysis.points, 2);
    assert_eq!(analysis.last_close, Some(190.5));
}

#[tokio::test]
async fn test_analyze_rejects_a_single_close() {
    let server = MockServer::start().await;
    let mut chart = yahoo_chart(190.5, 188.0);
    chart["chart"]["result"][0]["indicators"]["quote"][0]["close"] = json!([null, null, 190.5]);
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chart))
        .mount(&server)
        .await;

    let service = StockService::new(context(settings_for(&server)));
    let result = service
        .analyze("AAPL", Market::Us, HistoryRange::OneYear)
        .await;

    assert!(matches!(
        result,
        Err(FeedError::Core(investiq_core::Error::InsufficientData(_)))
    ));
}

#[tokio::test]
async fn test_fetch_market_keeps_order_and_skips_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/AAPL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(190.5, 188.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/GOOGL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(175.0, 170.0)))
        .mount(&server)
        .await;

    let service = StockService::new(context(settings_for(&server)));
    let rows = service.fetch_market(Market::Us, 3).await;

    let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "GOOGL"]);
    assert!(rows.iter().all(|r| r.market == Market::Us));
}

#[tokio::test]
async fn test_history_retries_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/TCS.NS"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/TCS.NS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(yahoo_chart(4100.0, 4050.0)))
        .expect(1)
        .mount(&server)
        .await;

    let service = StockService::new(context(settings_for(&server)));
    let history = service
        .fetch_history("tcs", Market::India, HistoryRange::OneMonth)
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
}
