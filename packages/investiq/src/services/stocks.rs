//! Stock quotes and daily history.
//!
//! Quotes come from a fallback chain (Finnhub, Alpha Vantage, Polygon,
//! Twelve Data, Yahoo Finance). Keyed providers join the chain only when a
//! key is configured. Each provider normalizes its own payload so the quote
//! always reflects the provider that answered.

use chrono::DateTime;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use investiq_core::{HistoryPoint, Market, Quote, StockData, TechnicalSummary};

use super::{
    parse_number, require_key, Context, ALPHA_VANTAGE_LIMIT, FINNHUB_LIMIT, POLYGON_LIMIT,
    TWELVE_DATA_LIMIT,
};
use crate::api::fallback::CachePolicy;
use crate::api::{fetch_with_fallback, with_retry, Fetched, Source, TtlCache};
use crate::{FeedError, Result};

/// Lookback window for daily history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HistoryRange {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[default]
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl HistoryRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryRange::OneMonth => "1mo",
            HistoryRange::ThreeMonths => "3mo",
            HistoryRange::SixMonths => "6mo",
            HistoryRange::OneYear => "1y",
            HistoryRange::TwoYears => "2y",
            HistoryRange::FiveYears => "5y",
        }
    }
}

impl fmt::Display for HistoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryRange {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1mo" => Ok(HistoryRange::OneMonth),
            "3mo" => Ok(HistoryRange::ThreeMonths),
            "6mo" => Ok(HistoryRange::SixMonths),
            "1y" => Ok(HistoryRange::OneYear),
            "2y" => Ok(HistoryRange::TwoYears),
            "5y" => Ok(HistoryRange::FiveYears),
            other => Err(format!(
                "unknown range '{}', expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y",
                other
            )),
        }
    }
}

/// Technical read-out for one symbol.
#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub symbol: String,
    pub market: Market,
    pub last_close: Option<f64>,
    pub points: usize,
    #[serde(flatten)]
    pub technicals: TechnicalSummary,
}

pub struct StockService {
    ctx: Context,
    quotes: TtlCache<Fetched<Quote>>,
}

impl StockService {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            quotes: TtlCache::new(),
        }
    }

    /// Latest quote for `symbol`, cached per symbol.
    pub async fn fetch_quote(&self, symbol: &str, market: Market) -> Result<Quote> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(FeedError::NoData("empty symbol".to_string()));
        }

        let keys = &self.ctx.settings.api_keys;
        let listed = market.exchange_symbol(&symbol);
        let mut sources = Vec::new();

        match market {
            Market::Us => {
                if keys.finnhub.is_some() {
                    sources.push(Source::new("Finnhub", 1, self.finnhub_quote(&symbol)));
                }
                if keys.alpha_vantage.is_some() {
                    sources.push(Source::new("Alpha Vantage", 2, self.alpha_vantage_quote(&symbol)));
                }
                if keys.polygon.is_some() {
                    sources.push(Source::new("Polygon", 3, self.polygon_quote(&symbol)));
                }
                if keys.twelve_data.is_some() {
                    sources.push(Source::new("Twelve Data", 4, self.twelve_data_quote(&symbol, &symbol)));
                }
                sources.push(Source::new("Yahoo Finance", 5, self.yahoo_quote(&symbol, &symbol)));
            }
            Market::India => {
                if keys.alpha_vantage.is_some() {
                    sources.push(Source::new("Alpha Vantage", 2, self.alpha_vantage_quote(&symbol)));
                }
                if keys.twelve_data.is_some() {
                    sources.push(Source::new("Twelve Data", 3, self.twelve_data_quote(&symbol, &listed)));
                }
                sources.push(Source::new("Yahoo Finance", 4, self.yahoo_quote(&symbol, &listed)));
            }
        }

        let policy = CachePolicy::new(
            &self.quotes,
            format!("stock-{}", symbol),
            self.ctx.settings.cache.quote_ttl(),
        );
        let fetched = fetch_with_fallback(sources, Some(policy)).await?;
        Ok(fetched.data)
    }

    /// Quotes for the first `limit` symbols of `market`, in list order.
    /// Symbols whose chain fails are logged and left out.
    pub async fn fetch_market(&self, market: Market, limit: usize) -> Vec<StockData> {
        let symbols: Vec<&str> = market.symbols().iter().take(limit).copied().collect();
        tracing::info!("Fetching {} {} quotes", symbols.len(), market);

        let results = join_all(symbols.iter().map(|s| self.fetch_quote(s, market))).await;

        symbols
            .iter()
            .zip(results)
            .filter_map(|(symbol, result)| match result {
                Ok(quote) => Some(StockData::from_quote(quote, market)),
                Err(e) => {
                    tracing::warn!("Failed to fetch {}: {}", symbol, e);
                    None
                }
            })
            .collect()
    }

    /// Daily closes from Yahoo Finance, oldest first.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        market: Market,
        range: HistoryRange,
    ) -> Result<Vec<HistoryPoint>> {
        let listed = market.exchange_symbol(&symbol.trim().to_uppercase());
        let url = format!("{}/v8/finance/chart/{}", self.ctx.settings.endpoints.yahoo, listed);
        let query = [("range", range.as_str()), ("interval", "1d")];
        let http = &self.ctx.settings.http;
        let envelope: ChartEnvelope = with_retry(
            http.retry_attempts,
            http.retry_base(),
            http.retry_jitter(),
            || self.ctx.http.get_json(&url, &query),
        )
        .await?;

        let result = envelope
            .first_result()
            .ok_or_else(|| FeedError::NoData(format!("no chart for {}", listed)))?;

        let history = result.history();
        if history.is_empty() {
            return Err(FeedError::NoData(format!("no history for {}", listed)));
        }
        Ok(history)
    }

    /// SMA, EMA, RSI, MACD and Bollinger bands over the symbol's daily history.
    pub async fn analyze(
        &self,
        symbol: &str,
        market: Market,
        range: HistoryRange,
    ) -> Result<StockAnalysis> {
        let history = self.fetch_history(symbol, market, range).await?;
        let latest_first: Vec<f64> = history.iter().rev().map(|p| p.value).collect();

        Ok(StockAnalysis {
            symbol: symbol.trim().to_uppercase(),
            market,
            last_close: latest_first.first().copied(),
            points: latest_first.len(),
            technicals: TechnicalSummary::analyze(&latest_first)?,
        })
    }

    async fn finnhub_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let key = require_key(&self.ctx.settings.api_keys.finnhub, "Finnhub")?;
        self.ctx.throttle(FINNHUB_LIMIT).await;

        let url = format!("{}/quote", self.ctx.settings.endpoints.finnhub);
        let raw: Option<FinnhubQuote> = self
            .ctx
            .http
            .get_json_opt(&url, &[("symbol", symbol), ("token", key.as_str())])
            .await?;

        Ok(raw.and_then(|q| q.into_quote(symbol)))
    }

    async fn alpha_vantage_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let key = require_key(&self.ctx.settings.api_keys.alpha_vantage, "Alpha Vantage")?;
        self.ctx.throttle(ALPHA_VANTAGE_LIMIT).await;

        let url = format!("{}/query", self.ctx.settings.endpoints.alpha_vantage);
        let raw: Option<AlphaVantageEnvelope> = self
            .ctx
            .http
            .get_json_opt(
                &url,
                &[
                    ("function", "GLOBAL_QUOTE"),
                    ("symbol", symbol),
                    ("apikey", key.as_str()),
                ],
            )
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        if let Some(note) = raw.note.or(raw.information) {
            return Err(FeedError::RateLimited(note));
        }
        Ok(raw
            .global_quote
            .and_then(|fields| global_quote(&fields, symbol)))
    }

    async fn polygon_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        let key = require_key(&self.ctx.settings.api_keys.polygon, "Polygon")?;
        self.ctx.throttle(POLYGON_LIMIT).await;

        let url = format!("{}/v2/last/trade/{}", self.ctx.settings.endpoints.polygon, symbol);
        let raw: Option<PolygonEnvelope> = self
            .ctx
            .http
            .get_json_opt(&url, &[("apiKey", key.as_str())])
            .await?;

        Ok(raw.and_then(|r| r.into_quote(symbol)))
    }

    async fn twelve_data_quote(&self, symbol: &str, listed: &str) -> Result<Option<Quote>> {
        let key = require_key(&self.ctx.settings.api_keys.twelve_data, "Twelve Data")?;
        self.ctx.throttle(TWELVE_DATA_LIMIT).await;

        let url = format!("{}/quote", self.ctx.settings.endpoints.twelve_data);
        let raw: Option<TwelveDataQuote> = self
            .ctx
            .http
            .get_json_opt(&url, &[("symbol", listed), ("apikey", key.as_str())])
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        if raw.status.as_deref() == Some("error") {
            return Err(FeedError::NoData(
                raw.message.unwrap_or_else(|| format!("Twelve Data has no quote for {}", listed)),
            ));
        }
        Ok(raw.into_quote(symbol))
    }

    async fn yahoo_quote(&self, symbol: &str, listed: &str) -> Result<Option<Quote>> {
        let url = format!("{}/v8/finance/chart/{}", self.ctx.settings.endpoints.yahoo, listed);
        let raw: Option<ChartEnvelope> = self.ctx.http.get_json_opt(&url, &[]).await?;

        Ok(raw
            .as_ref()
            .and_then(ChartEnvelope::first_result)
            .and_then(|r| r.quote(symbol)))
    }
}

/// Zero or missing prices are treated as no data.
fn priced(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    c: Option<f64>,
    d: Option<f64>,
    dp: Option<f64>,
}

impl FinnhubQuote {
    fn into_quote(self, symbol: &str) -> Option<Quote> {
        Some(Quote {
            symbol: symbol.to_string(),
            price: priced(self.c)?,
            change: self.d.unwrap_or(0.0),
            change_percent: self.dp.unwrap_or(0.0),
            volume: None,
            source: "Finnhub".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AlphaVantageEnvelope {
    #[serde(rename = "Global Quote")]
    global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

fn global_quote(fields: &HashMap<String, String>, symbol: &str) -> Option<Quote> {
    let field = |name: &str| fields.get(name).and_then(|v| parse_number(v));
    Some(Quote {
        symbol: symbol.to_string(),
        price: priced(field("05. price"))?,
        change: field("09. change").unwrap_or(0.0),
        change_percent: field("10. change percent").unwrap_or(0.0),
        volume: field("06. volume"),
        source: "Alpha Vantage".to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct PolygonEnvelope {
    results: Option<PolygonTrade>,
}

#[derive(Debug, Deserialize)]
struct PolygonTrade {
    p: Option<f64>,
    s: Option<f64>,
}

impl PolygonEnvelope {
    fn into_quote(self, symbol: &str) -> Option<Quote> {
        let trade = self.results?;
        Some(Quote {
            symbol: symbol.to_string(),
            price: priced(trade.p)?,
            change: 0.0,
            change_percent: 0.0,
            volume: trade.s,
            source: "Polygon".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwelveDataQuote {
    close: Option<String>,
    price: Option<String>,
    change: Option<String>,
    percent_change: Option<String>,
    volume: Option<String>,
    status: Option<String>,
    message: Option<String>,
}

impl TwelveDataQuote {
    fn into_quote(self, symbol: &str) -> Option<Quote> {
        let number = |v: &Option<String>| v.as_deref().and_then(parse_number);
        let price = priced(number(&self.close).or_else(|| number(&self.price)))?;
        Some(Quote {
            symbol: symbol.to_string(),
            price,
            change: number(&self.change).unwrap_or(0.0),
            change_percent: number(&self.percent_change).unwrap_or(0.0),
            volume: number(&self.volume),
            source: "Twelve Data".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    regular_market_change: Option<f64>,
    regular_market_change_percent: Option<f64>,
    regular_market_volume: Option<f64>,
    chart_previous_close: Option<f64>,
    previous_close: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

impl ChartEnvelope {
    fn first_result(&self) -> Option<&ChartResult> {
        self.chart.result.as_ref()?.first()
    }
}

impl ChartResult {
    fn closes(&self) -> &[Option<f64>] {
        self.indicators
            .quote
            .first()
            .map(|q| q.close.as_slice())
            .unwrap_or(&[])
    }

    fn quote(&self, symbol: &str) -> Option<Quote> {
        let meta = &self.meta;
        let last_close = self.closes().iter().rev().find_map(|c| *c);
        let price = priced(meta.regular_market_price.or(last_close))?;

        let previous = meta.chart_previous_close.or(meta.previous_close);
        let change = meta
            .regular_market_change
            .or_else(|| previous.map(|p| price - p))
            .unwrap_or(0.0);
        let change_percent = meta
            .regular_market_change_percent
            .or_else(|| previous.filter(|p| *p > 0.0).map(|p| (price - p) / p * 100.0))
            .unwrap_or(0.0);

        Some(Quote {
            symbol: symbol.to_string(),
            price,
            change,
            change_percent,
            volume: meta.regular_market_volume,
            source: "Yahoo Finance".to_string(),
        })
    }

    fn history(&self) -> Vec<HistoryPoint> {
        self.timestamp
            .iter()
            .zip(self.closes())
            .filter_map(|(ts, close)| {
                let value = (*close)?;
                let day = DateTime::from_timestamp(*ts, 0)?;
                Some(HistoryPoint::new(day.format("%Y-%m-%d").to_string(), value))
            })
            .collect()
    }
}
