mod common;

use investiq::services::NewsService;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{context, settings_for, CRYPTO_RSS, MARKETS_RSS};

fn rss(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "application/rss+xml")
        .set_body_string(body)
}

#[tokio::test]
async fn test_newsapi_articles_are_used_and_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(query_param("apiKey", "news-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "articles": [{
                "title": "Fed holds rates steady",
                "url": "https://news.example.com/fed",
                "source": { "name": "Reuters" },
                "publishedAt": "2025-01-14T15:30:00Z",
                "description": "Policy makers kept rates unchanged.",
                "urlToImage": "https://img.example.com/fed.jpg"
            }, {
                "title": null,
                "url": null,
                "source": null,
                "publishedAt": null,
                "urlToImage": "data:image/png;base64,AAAA"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.newsapi = Some("news-key".to_string());
    let service = NewsService::new(context(settings));

    let fetched = service.fetch_news().await.unwrap();
    assert_eq!(fetched.source, "NewsAPI");
    assert_eq!(fetched.data.len(), 2);

    let fed = &fetched.data[0];
    assert_eq!(fed.source, "Reuters");
    assert_eq!(fed.category, "Business");
    assert_eq!(fed.image.as_deref(), Some("https://img.example.com/fed.jpg"));
    assert_eq!(fed.published.to_rfc3339(), "2025-01-14T15:30:00+00:00");

    let blank = &fetched.data[1];
    assert_eq!(blank.title, "Untitled");
    assert_eq!(blank.link, "#");
    assert_eq!(blank.source, "Unknown");
    assert_eq!(blank.image, None);

    let again = service.fetch_news().await.unwrap();
    assert_eq!(again, fetched);
}

#[tokio::test]
async fn test_empty_newsapi_falls_back_to_rss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "articles": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss/markets"))
        .respond_with(rss(MARKETS_RSS))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.newsapi = Some("news-key".to_string());
    let service = NewsService::new(context(settings));

    let fetched = service.fetch_news().await.unwrap();
    assert_eq!(fetched.source, "RSS Feeds");
    assert_eq!(fetched.data.len(), 3);
    // Newest first
    assert_eq!(fetched.data[0].title, "Short");
    assert_eq!(fetched.data[1].title, "Oil slips on demand worries");
    assert_eq!(fetched.data[2].summary, "Broad gains across sectors.");
}

#[tokio::test]
async fn test_bing_used_when_rss_feeds_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news/search"))
        .and(query_param("format", "rss"))
        .respond_with(rss(MARKETS_RSS))
        .mount(&server)
        .await;

    let service = NewsService::new(context(settings_for(&server)));
    let fetched = service.fetch_news().await.unwrap();

    assert_eq!(fetched.source, "Bing News");
    assert!(fetched.data.iter().all(|n| n.source == "Bing News"));
    assert!(fetched.data.iter().all(|n| n.image.is_none()));
}

#[tokio::test]
async fn test_static_headlines_when_everything_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.api_keys.gnews = Some("gnews-key".to_string());
    let service = NewsService::new(context(settings));

    let fetched = service.fetch_news().await.unwrap();
    assert_eq!(fetched.source, "Static Fallback");
    assert!(!fetched.data.is_empty());
}

#[tokio::test]
async fn test_category_news_dedupes_and_sorts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss/markets"))
        .respond_with(rss(MARKETS_RSS))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rss/crypto"))
        .respond_with(rss(CRYPTO_RSS))
        .mount(&server)
        .await;

    let service = NewsService::new(context(settings_for(&server)));
    let news = service.fetch_category_news(3, 10).await;

    let titles: Vec<&str> = news.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Oil slips on demand worries",
            "Bitcoin tops previous high",
            "Stocks rally as inflation cools",
        ]
    );
    // Feed title when present, category otherwise
    assert_eq!(news[0].source, "Market Wire");
    assert_eq!(news[1].source, "Crypto");
    assert_eq!(news[1].category, "Crypto");

    let capped = service.fetch_category_news(3, 2).await;
    assert_eq!(capped.len(), 2);
}
