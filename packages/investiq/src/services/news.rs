//! Financial headlines.
//!
//! [`NewsService::fetch_news`] walks a fallback chain: NewsAPI, GNews,
//! Currents, a bundle of RSS feeds, Bing News and finally a static set of
//! headlines, so the chain never comes back empty.
//! [`NewsService::fetch_category_news`] aggregates the per-category feeds
//! that go into the snapshot.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashSet;

use investiq_core::NewsItem;

use super::{require_key, Context, CURRENTS_LIMIT, GNEWS_LIMIT, NEWSAPI_LIMIT};
use crate::api::fallback::CachePolicy;
use crate::api::{fetch_with_fallback, Fetched, Source, TtlCache};
use crate::config::CategoryFeed;
use crate::rss::{self, RssItem};
use crate::{FeedError, Result};

/// Cache key of the merged headline list.
pub const NEWS_CACHE_KEY: &str = "news-data";

const HEADLINE_LIMIT: usize = 20;
const SUMMARY_CHARS: usize = 200;
const MIN_TITLE_CHARS: usize = 10;

pub struct NewsService {
    ctx: Context,
    cache: TtlCache<Fetched<Vec<NewsItem>>>,
}

impl NewsService {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            cache: TtlCache::new(),
        }
    }

    /// Headlines from the first source in the chain that has any.
    pub async fn fetch_news(&self) -> Result<Fetched<Vec<NewsItem>>> {
        let keys = &self.ctx.settings.api_keys;
        let mut sources = Vec::new();

        if keys.newsapi.is_some() {
            sources.push(Source::new("NewsAPI", 1, self.newsapi()));
        }
        if keys.gnews.is_some() {
            sources.push(Source::new("GNews", 2, self.gnews()));
        }
        if keys.currents.is_some() {
            sources.push(Source::new("Currents API", 3, self.currents()));
        }
        sources.push(Source::new("RSS Feeds", 4, self.rss_bundle()));
        sources.push(Source::new("Bing News", 5, self.bing()));
        sources.push(Source::new("Static Fallback", 6, async {
            Ok(Some(static_headlines(Utc::now())))
        }));

        let policy = CachePolicy::new(&self.cache, NEWS_CACHE_KEY, self.ctx.settings.cache.news_ttl());
        fetch_with_fallback(sources, Some(policy)).await
    }

    /// Articles from every category feed: at most `per_feed` per feed,
    /// unique titles, newest first, capped at `limit`.
    pub async fn fetch_category_news(&self, per_feed: usize, limit: usize) -> Vec<NewsItem> {
        let feeds = &self.ctx.settings.endpoints.category_feeds;
        tracing::info!("Fetching news from {} category feeds", feeds.len());

        let batches = join_all(feeds.iter().map(|feed| self.category_feed(feed, per_feed))).await;

        let mut seen = HashSet::new();
        let mut articles: Vec<NewsItem> = batches
            .into_iter()
            .flatten()
            .filter(|item| seen.insert(item.title.clone()))
            .collect();

        articles.sort_by(|a, b| b.published.cmp(&a.published));
        articles.truncate(limit);

        tracing::info!("Fetched {} news articles", articles.len());
        articles
    }

    async fn category_feed(&self, feed: &CategoryFeed, per_feed: usize) -> Vec<NewsItem> {
        let parsed = rss::fetch_feed(&self.ctx.http, &feed.url).await;
        let source = parsed
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| feed.category.clone());

        parsed
            .items
            .into_iter()
            .filter(|item| item.title.trim().chars().count() >= MIN_TITLE_CHARS)
            .take(per_feed)
            .map(|item| {
                let mut news = from_rss(item, &feed.category);
                news.source = source.clone();
                news
            })
            .collect()
    }

    async fn newsapi(&self) -> Result<Option<Vec<NewsItem>>> {
        let key = require_key(&self.ctx.settings.api_keys.newsapi, "NewsAPI")?;
        self.ctx.throttle(NEWSAPI_LIMIT).await;

        let url = format!("{}/v2/top-headlines", self.ctx.settings.endpoints.newsapi);
        let raw: Option<ArticleEnvelope> = self
            .ctx
            .http
            .get_json_opt(
                &url,
                &[
                    ("category", "business"),
                    ("language", "en"),
                    ("pageSize", "20"),
                    ("apiKey", key.as_str()),
                ],
            )
            .await?;

        Ok(non_empty(raw.map(|r| {
            r.articles
                .into_iter()
                .map(|a| a.into_news(|a| a.url_to_image.clone()))
                .collect()
        })))
    }

    async fn gnews(&self) -> Result<Option<Vec<NewsItem>>> {
        let key = require_key(&self.ctx.settings.api_keys.gnews, "GNews")?;
        self.ctx.throttle(GNEWS_LIMIT).await;

        let url = format!("{}/api/v4/top-headlines", self.ctx.settings.endpoints.gnews);
        let raw: Option<ArticleEnvelope> = self
            .ctx
            .http
            .get_json_opt(
                &url,
                &[
                    ("category", "business"),
                    ("lang", "en"),
                    ("max", "20"),
                    ("apikey", key.as_str()),
                ],
            )
            .await?;

        Ok(non_empty(raw.map(|r| {
            r.articles
                .into_iter()
                .map(|a| a.into_news(|a| a.image.clone()))
                .collect()
        })))
    }

    async fn currents(&self) -> Result<Option<Vec<NewsItem>>> {
        let key = require_key(&self.ctx.settings.api_keys.currents, "Currents")?;
        self.ctx.throttle(CURRENTS_LIMIT).await;

        let url = format!("{}/v1/latest-news", self.ctx.settings.endpoints.currents);
        let raw: Option<CurrentsEnvelope> = self
            .ctx
            .http
            .get_json_opt(
                &url,
                &[
                    ("category", "business"),
                    ("language", "en"),
                    ("apiKey", key.as_str()),
                ],
            )
            .await?;

        Ok(non_empty(raw.map(|r| {
            r.news.into_iter().map(CurrentsArticle::into_news).collect()
        })))
    }

    async fn rss_bundle(&self) -> Result<Option<Vec<NewsItem>>> {
        let feeds = &self.ctx.settings.endpoints.rss_feeds;
        let parsed = join_all(feeds.iter().map(|url| rss::fetch_feed(&self.ctx.http, url))).await;

        let mut items: Vec<NewsItem> = parsed
            .into_iter()
            .flat_map(|feed| feed.items)
            .map(|item| {
                let mut news = from_rss(item, "Business");
                if news.source.is_empty() {
                    news.source = "RSS Feed".to_string();
                }
                news
            })
            .collect();

        if items.is_empty() {
            return Err(FeedError::NoData("no RSS news items found".to_string()));
        }

        items.sort_by(|a, b| b.published.cmp(&a.published));
        items.truncate(HEADLINE_LIMIT);
        Ok(Some(items))
    }

    async fn bing(&self) -> Result<Option<Vec<NewsItem>>> {
        let url = format!("{}/news/search", self.ctx.settings.endpoints.bing_news);
        let body = self
            .ctx
            .http
            .get_text(&url, &[("q", "financial markets"), ("format", "rss")])
            .await?;

        let feed = rss::parse_rss(&body, "Bing News")?;
        if feed.items.is_empty() {
            return Err(FeedError::NoData("no Bing news items found".to_string()));
        }

        Ok(Some(
            feed.items
                .into_iter()
                .take(HEADLINE_LIMIT)
                .map(|item| {
                    let mut news = from_rss(item, "Business");
                    news.source = "Bing News".to_string();
                    news.image = None;
                    news
                })
                .collect(),
        ))
    }
}

fn non_empty(items: Option<Vec<NewsItem>>) -> Option<Vec<NewsItem>> {
    items.filter(|i| !i.is_empty())
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn image_url(value: Option<String>) -> Option<String> {
    value.filter(|v| v.starts_with("http"))
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Parse provider timestamps, falling back to now.
fn published_at(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        rss::parse_date(s).or_else(|| {
            DateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S %z")
                .ok()
                .map(|d| d.with_timezone(&Utc))
        })
    })
    .unwrap_or_else(Utc::now)
}

fn from_rss(item: RssItem, category: &str) -> NewsItem {
    NewsItem {
        title: or_default(Some(item.title), "Untitled"),
        link: or_default(Some(item.link), "#"),
        source: item.source,
        published: item.published.unwrap_or_else(Utc::now),
        summary: truncate_chars(&item.description, SUMMARY_CHARS),
        category: category.to_string(),
        image: item.image,
    }
}

#[derive(Debug, Deserialize)]
struct ArticleEnvelope {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    source: Option<ArticleSource>,
    published_at: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url_to_image: Option<String>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleSource {
    name: Option<String>,
}

impl Article {
    fn into_news(self, image: impl Fn(&Article) -> Option<String>) -> NewsItem {
        let image = image_url(image(&self));
        NewsItem {
            published: published_at(self.published_at.as_deref()),
            title: or_default(self.title, "Untitled"),
            link: or_default(self.url, "#"),
            source: or_default(self.source.and_then(|s| s.name), "Unknown"),
            summary: self.description.or(self.content).unwrap_or_default(),
            category: "Business".to_string(),
            image,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentsEnvelope {
    #[serde(default)]
    news: Vec<CurrentsArticle>,
}

#[derive(Debug, Deserialize)]
struct CurrentsArticle {
    title: Option<String>,
    url: Option<String>,
    author: Option<String>,
    published: Option<String>,
    description: Option<String>,
    #[serde(default)]
    category: Vec<String>,
    image: Option<String>,
}

impl CurrentsArticle {
    fn into_news(self) -> NewsItem {
        NewsItem {
            published: published_at(self.published.as_deref()),
            title: or_default(self.title, "Untitled"),
            link: or_default(self.url, "#"),
            source: or_default(self.author, "Unknown"),
            summary: self.description.unwrap_or_default(),
            category: or_default(self.category.into_iter().next(), "Business"),
            image: image_url(self.image),
        }
    }
}

/// Canned headlines used when every live source fails.
pub fn static_headlines(now: DateTime<Utc>) -> Vec<NewsItem> {
    let headline = |hours_ago: i64, title: &str, source: &str, category: &str, summary: &str| NewsItem {
        title: title.to_string(),
        link: "#".to_string(),
        source: source.to_string(),
        published: now - ChronoDuration::hours(hours_ago),
        summary: summary.to_string(),
        category: category.to_string(),
        image: None,
    };

    vec![
        headline(
            0,
            "Global Markets Rally as Inflation Data Shows Cooling Trend",
            "Bloomberg",
            "Markets",
            "Stocks across Asia and Europe surged after the latest US inflation print came in lower than expected, fueling hopes of rate cuts.",
        ),
        headline(
            1,
            "Bitcoin Reclaims $65,000 Level Amid Institutional Inflows",
            "CoinDesk",
            "Cryptocurrency",
            "The largest cryptocurrency saw renewed buying interest from ETFs, pushing the price back above key resistance levels.",
        ),
        headline(
            2,
            "Tech Giants Announce New AI Partnerships",
            "TechCrunch",
            "Technology",
            "Leading tech firms are joining forces to establish new standards for artificial intelligence safety and development.",
        ),
        headline(
            3,
            "India's GDP Growth Forecast Upgraded by IMF",
            "Economic Times",
            "Economy",
            "The International Monetary Fund has raised its growth projection for India, citing strong domestic demand and manufacturing output.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_newsapi_article_defaults() {
        let raw: ArticleEnvelope = serde_json::from_str(
            r#"{"status":"ok","articles":[
                {"title":null,"url":null,"source":{"id":null,"name":null},
                 "publishedAt":"2025-01-14T10:30:00Z","description":null,
                 "content":"Body text","urlToImage":""}
            ]}"#,
        )
        .unwrap();

        let item = raw
            .articles
            .into_iter()
            .next()
            .unwrap()
            .into_news(|a| a.url_to_image.clone());

        assert_eq!(item.title, "Untitled");
        assert_eq!(item.link, "#");
        assert_eq!(item.source, "Unknown");
        assert_eq!(item.summary, "Body text");
        assert_eq!(item.category, "Business");
        assert_eq!(item.image, None);
        assert_eq!(
            item.published,
            Utc.with_ymd_and_hms(2025, 1, 14, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_currents_article() {
        let raw: CurrentsEnvelope = serde_json::from_str(
            r#"{"status":"ok","news":[
                {"title":"Rupee firms","url":"https://x.test/a","author":"Reuters",
                 "published":"2025-01-14 08:15:00 +0000","description":"FX desk",
                 "category":["finance"],"image":"None"}
            ]}"#,
        )
        .unwrap();

        let item = raw.news.into_iter().next().unwrap().into_news();
        assert_eq!(item.source, "Reuters");
        assert_eq!(item.category, "finance");
        assert_eq!(item.image, None);
        assert_eq!(
            item.published,
            Utc.with_ymd_and_hms(2025, 1, 14, 8, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_static_headlines_are_spaced_hourly() {
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 12, 0, 0).unwrap();
        let items = static_headlines(now);

        assert_eq!(items.len(), 4);
        assert_eq!(items[0].published, now);
        assert_eq!(items[3].published, now - ChronoDuration::hours(3));
    }

    #[test]
    fn test_summary_truncation() {
        let item = from_rss(
            RssItem {
                title: "A sufficiently long title".to_string(),
                description: "x".repeat(500),
                ..RssItem::default()
            },
            "Markets",
        );
        assert_eq!(item.summary.chars().count(), SUMMARY_CHARS);
        assert_eq!(item.link, "#");
    }
}
