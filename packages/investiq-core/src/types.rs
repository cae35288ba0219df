//! Core data types for the InvestIQ market model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analysis::{quote_signal, Signal};
use crate::indicators::{latest_rsi_chronological, period_return};
use crate::scoring::{self, MetricAssessment, Recommendation};
use crate::Error;

/// Top US large caps tracked by default.
pub const US_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "TSLA", "META", "BRK-B", "V", "JNJ", "WMT", "JPM",
    "MA", "PG", "UNH", "HD", "BAC", "DIS", "ADBE", "CRM", "NFLX", "CMCSA", "PFE", "ORCL", "KO",
    "NKE", "INTC", "AMD",
];

/// Nifty 50 constituents tracked by default (NSE tickers without suffix).
pub const NIFTY_50_SYMBOLS: &[&str] = &[
    "RELIANCE", "TCS", "HDFCBANK", "INFY", "ICICIBANK", "HINDUNILVR", "SBIN", "BHARTIARTL", "ITC",
    "KOTAKBANK", "LT", "AXISBANK", "ASIANPAINT", "HCLTECH", "MARUTI", "SUNPHARMA", "TITAN",
    "BAJFINANCE", "ULTRACEMCO", "WIPRO", "ADANIPORTS", "NTPC", "ONGC", "POWERGRID", "M&M",
    "TATASTEEL", "JSWSTEEL", "INDUSINDBK", "TECHM", "TATAMOTORS",
];

/// Trading days in roughly six months.
pub const SIX_MONTH_BARS: usize = 126;

/// Equity market a symbol trades on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Us,
    India,
}

impl Market {
    /// Default symbols tracked for this market.
    pub fn symbols(&self) -> &'static [&'static str] {
        match self {
            Market::Us => US_SYMBOLS,
            Market::India => NIFTY_50_SYMBOLS,
        }
    }

    /// Symbol as listed on exchange-aware providers (Yahoo, Twelve Data).
    ///
    /// NSE listings carry a `.NS` suffix; US tickers are used as-is.
    pub fn exchange_symbol(&self, symbol: &str) -> String {
        let symbol = symbol.to_uppercase();
        match self {
            Market::India if !symbol.ends_with(".NS") => format!("{}.NS", symbol),
            _ => symbol,
        }
    }

    /// Currency prefix used when formatting prices.
    pub fn currency(&self) -> &'static str {
        match self {
            Market::Us => "$",
            Market::India => "₹",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Market::Us => write!(f, "us"),
            Market::India => write!(f, "india"),
        }
    }
}

impl FromStr for Market {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" | "usa" => Ok(Market::Us),
            "india" | "in" | "nifty" | "nse" => Ok(Market::India),
            other => Err(Error::InvalidInput(format!("unknown market: {}", other))),
        }
    }
}

/// Asset class of a favorite, alert or position.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stock,
    Crypto,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Stock => write!(f, "stock"),
            AssetKind::Crypto => write!(f, "crypto"),
        }
    }
}

impl FromStr for AssetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" | "stocks" => Ok(AssetKind::Stock),
            "crypto" | "coin" => Ok(AssetKind::Crypto),
            other => Err(Error::InvalidInput(format!("unknown asset kind: {}", other))),
        }
    }
}

/// One point of a price chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryPoint {
    /// Date (YYYY-MM-DD)
    pub time: String,
    /// Closing price
    pub value: f64,
}

impl HistoryPoint {
    pub fn new(time: impl Into<String>, value: f64) -> Self {
        Self {
            time: time.into(),
            value,
        }
    }
}

/// Latest price for a symbol, used to check alerts and revalue positions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub symbol: String,
    pub price: f64,
}

impl PricePoint {
    pub fn new(symbol: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price,
        }
    }
}

/// A quote normalized from whichever provider answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    /// Ticker as requested (without exchange suffix)
    pub symbol: String,
    /// Last traded price
    pub price: f64,
    /// Absolute change since previous close
    pub change: f64,
    /// Percentage change since previous close
    pub change_percent: f64,
    /// Session volume, when the provider reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Provider that produced this quote
    pub source: String,
}

/// Fundamental metrics for a listed company. All optional: free data
/// sources rarely report every field.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Fundamentals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peg_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_book: Option<f64>,
    /// Return on capital employed, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roce: Option<f64>,
    /// Year-over-year EPS growth, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps_growth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_ebitda: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_to_ebitda: Option<f64>,
    /// Free cash flow yield, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcf_yield: Option<f64>,
    /// Operating margin, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_margins: Option<f64>,
    /// Net profit margin as a fraction (0.15 = 15%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_cashflow: Option<f64>,
    /// Institutional ownership, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institutional_holding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyst_target_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moving_average_50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moving_average_200: Option<f64>,
}

/// A ranked stock row as shown in the market tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockData {
    pub symbol: String,
    pub name: String,
    pub market: Market,
    pub current_price: f64,
    pub change: f64,
    #[serde(rename = "changePercent")]
    pub change_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, flatten)]
    pub fundamentals: Fundamentals,
    /// Fair-value band, +/-10% around the current price
    pub ideal_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_6m_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(
        rename = "institutionalHolding",
        skip_serializing_if = "Option::is_none"
    )]
    pub institutional_holding_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_quality: Option<String>,
    /// Day-change signal (BUY above +2%, SELL below -2%)
    pub signal: Signal,
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
    pub score: u8,
    pub recommendation: Recommendation,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub source: String,
}

impl StockData {
    /// Build an unscored row from a quote.
    pub fn from_quote(quote: Quote, market: Market) -> Self {
        let ideal_range = format!(
            "{cur}{:.0} - {cur}{:.0}",
            quote.price * 0.9,
            quote.price * 1.1,
            cur = market.currency()
        );

        let mut row = Self {
            name: quote.symbol.clone(),
            symbol: quote.symbol,
            market,
            current_price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            volume: quote.volume,
            fundamentals: Fundamentals::default(),
            ideal_range,
            price_6m_return: None,
            rsi: None,
            institutional_holding_label: None,
            earnings_quality: None,
            signal: quote_signal(quote.change_percent),
            history: Vec::new(),
            score: 0,
            recommendation: Recommendation::Hold,
            reasons: Vec::new(),
            source: quote.source,
        };
        row.rescore();
        row
    }

    /// Attach fundamentals and re-score.
    pub fn with_fundamentals(mut self, fundamentals: Fundamentals) -> Self {
        if let Some(name) = &fundamentals.name {
            self.name = name.clone();
        }
        self.institutional_holding_label = fundamentals
            .institutional_holding
            .map(|h| format!("{:.1}%", h));
        self.earnings_quality = Some(
            scoring::earnings_quality(fundamentals.profit_margin, fundamentals.fcf_yield)
                .to_string(),
        );
        self.fundamentals = fundamentals;
        self.rescore();
        self
    }

    /// Attach a chronological price history, derive 6M return and RSI, re-score.
    pub fn with_history(mut self, history: Vec<HistoryPoint>) -> Self {
        let closes: Vec<f64> = history.iter().map(|p| p.value).collect();
        // Needs a full six months; shorter histories score on the day's change
        self.price_6m_return = period_return(&closes, SIX_MONTH_BARS - 1);
        self.rsi = latest_rsi_chronological(&closes, 14);
        self.history = history;
        self.rescore();
        self
    }

    /// Recompute score, recommendation and reasons from current fields.
    pub fn rescore(&mut self) {
        let return_6m = self.price_6m_return.or(Some(self.change_percent));
        self.score = scoring::stock_composite_score(&self.fundamentals, return_6m);
        self.recommendation = Recommendation::from_score(self.score);
        self.reasons = scoring::stock_reasons(&self.fundamentals, self.change_percent);
    }
}

/// A ranked cryptocurrency row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoData {
    /// CoinGecko id (e.g. "bitcoin")
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub current_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<f64>,
    pub price_change_24h: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_30d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_1y: Option<f64>,
    pub rsi: f64,
    pub adx: f64,
    pub cmf: f64,
    pub distance_from_200_ema: f64,
    pub macd_slope: f64,
    pub trend: scoring::Trend,
    pub score: u8,
    pub institutional_score: u8,
    pub score_breakdown: String,
    pub recommendation: scoring::CryptoRating,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

/// A financial news headline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Everything the app shows, as produced by the snapshot pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub nifty_50: Vec<StockData>,
    #[serde(default)]
    pub us_stocks: Vec<StockData>,
    #[serde(default)]
    pub crypto: Vec<CryptoData>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

impl MarketSnapshot {
    /// An empty snapshot stamped now.
    pub fn empty() -> Self {
        Self {
            last_updated: Utc::now(),
            nifty_50: Vec::new(),
            us_stocks: Vec::new(),
            crypto: Vec::new(),
            news: Vec::new(),
        }
    }

    /// Latest prices for every stock and coin in the snapshot. Coins are keyed
    /// by id, as live prices are.
    pub fn price_points(&self) -> Vec<PricePoint> {
        self.stocks()
            .map(|s| PricePoint::new(&s.symbol, s.current_price))
            .chain(
                self.crypto
                    .iter()
                    .map(|c| PricePoint::new(&c.id, c.current_price)),
            )
            .collect()
    }

    /// Metric read-out for a stock symbol, or a coin id or symbol.
    pub fn assess(&self, id: &str) -> Option<Vec<MetricAssessment>> {
        let id = id.trim();
        if let Some(stock) = self.stocks().find(|s| s.symbol.eq_ignore_ascii_case(id)) {
            return Some(scoring::assess_stock(stock));
        }
        self.crypto
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id) || c.symbol.eq_ignore_ascii_case(id))
            .map(scoring::assess_crypto)
    }

    fn stocks(&self) -> impl Iterator<Item = &StockData> {
        self.nifty_50.iter().chain(self.us_stocks.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.nifty_50.is_empty()
            && self.us_stocks.is_empty()
            && self.crypto.is_empty()
            && self.news.is_empty()
    }
}

/// Map NaN and infinities to `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
