//! RSS 2.0 feed parsing

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::api::HttpClient;
use crate::{FeedError, Result};

/// One `<item>` of a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: Option<DateTime<Utc>>,
    pub image: Option<String>,
    /// Host name of the feed URL
    pub source: String,
}

/// A parsed channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssFeed {
    /// Channel `<title>`
    pub title: Option<String>,
    pub items: Vec<RssItem>,
}

#[derive(Clone, Copy)]
enum Field {
    Title,
    Link,
    Description,
    Published,
}

/// Parse an RSS document. `source` is stamped on every item.
pub fn parse_rss(xml: &str, source: &str) -> Result<RssFeed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = RssFeed::default();
    let mut current: Option<RssItem> = None;
    let mut field: Option<Field> = None;
    // Child elements open inside the current field
    let mut nested = 0usize;
    let mut channel_title = false;
    let mut published_raw = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if field.is_some() => {
                nested += 1;
                if let Some(item) = current.as_mut() {
                    take_image(&e, item);
                }
            }
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"item" => {
                    current = Some(RssItem {
                        source: source.to_string(),
                        ..RssItem::default()
                    });
                    published_raw.clear();
                }
                b"title" if current.is_some() => field = Some(Field::Title),
                b"title" if feed.title.is_none() && feed.items.is_empty() => channel_title = true,
                b"link" if current.is_some() => field = Some(Field::Link),
                b"description" if current.is_some() => field = Some(Field::Description),
                b"pubDate" | b"dc:date" if current.is_some() => field = Some(Field::Published),
                _ => {
                    if let Some(item) = current.as_mut() {
                        take_image(&e, item);
                    }
                }
            },
            Ok(Event::Empty(e)) => {
                if let Some(item) = current.as_mut() {
                    take_image(&e, item);
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| FeedError::Parse(e.to_string()))?;
                append(&mut current, field, &mut published_raw, &text);
                if channel_title {
                    feed.title = Some(text.trim().to_string());
                }
            }
            Ok(Event::CData(c)) => {
                let bytes = c.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append(&mut current, field, &mut published_raw, &text);
                if channel_title {
                    feed.title = Some(text.trim().to_string());
                }
            }
            Ok(Event::End(_)) if nested > 0 => nested -= 1,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"item" => {
                    if let Some(mut item) = current.take() {
                        item.published = parse_date(&published_raw);
                        item.description = strip_html(&item.description);
                        feed.items.push(item);
                    }
                    field = None;
                }
                b"title" => {
                    channel_title = false;
                    field = None;
                }
                _ => field = None,
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    Ok(feed)
}

fn append(current: &mut Option<RssItem>, field: Option<Field>, published: &mut String, text: &str) {
    let (Some(item), Some(field)) = (current.as_mut(), field) else {
        return;
    };
    match field {
        Field::Title => push_words(&mut item.title, text),
        Field::Link => item.link.push_str(text.trim()),
        Field::Description => push_words(&mut item.description, text),
        Field::Published => published.push_str(text.trim()),
    }
}

/// Text around child elements arrives in trimmed pieces; keep them apart.
fn push_words(buf: &mut String, text: &str) {
    if !buf.is_empty() && !buf.ends_with(char::is_whitespace) {
        buf.push(' ');
    }
    buf.push_str(text);
}

fn take_image(e: &BytesStart<'_>, item: &mut RssItem) {
    if item.image.is_some() {
        return;
    }

    let url = || {
        e.try_get_attribute("url")
            .ok()
            .flatten()
            .and_then(|a| a.unescape_value().ok())
            .map(|v| v.into_owned())
    };

    match e.name().as_ref() {
        b"media:content" | b"media:thumbnail" => item.image = url(),
        b"enclosure" => {
            let is_image = e
                .try_get_attribute("type")
                .ok()
                .flatten()
                .and_then(|a| a.unescape_value().ok())
                .is_some_and(|t| t.starts_with("image"));
            if is_image {
                item.image = url();
            }
        }
        _ => {}
    }
}

/// Parse an RFC 2822 or RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// Host part of a feed URL, or the URL itself if it does not parse.
pub fn feed_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Drop markup from an HTML fragment and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fetch and parse a feed. Any failure yields an empty feed.
pub async fn fetch_feed(http: &HttpClient, url: &str) -> RssFeed {
    let body = match http.get_text(url, &[]).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to fetch feed {}: {}", url, e);
            return RssFeed::default();
        }
    };

    match parse_rss(&body, &feed_host(url)) {
        Ok(feed) => feed,
        Err(e) => {
            tracing::warn!("Failed to parse feed {}: {}", url, e);
            RssFeed::default()
        }
    }
}
