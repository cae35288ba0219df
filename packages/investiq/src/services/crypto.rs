//! Cryptocurrency prices and ranked market rows.
//!
//! Live prices come from CoinGecko with Binance as fallback. Market rows are
//! fetched in small batches from CoinGecko, then each coin's 200-day chart
//! feeds RSI, ADX, CMF, the 200-day EMA trend and MACD slope.

use chrono::DateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use investiq_core::indicators::{
    adx, cmf, distance_from, ema, latest_rsi_chronological, macd, macd_slope, Candles, DEFAULT_ADX,
};
use investiq_core::scoring::{
    crypto_reasons, crypto_recommendation, crypto_score, institutional_crypto_score,
    score_breakdown, CryptoSignals, Trend,
};
use investiq_core::{CryptoData, HistoryPoint, PricePoint};

use super::Context;
use crate::api::{fetch_with_fallback, Source};
use crate::{FeedError, Result};

/// CoinGecko ids priced by [`CryptoService::live_prices`] and their Binance pairs.
pub const LIVE_PRICE_IDS: [(&str, Option<&str>); 10] = [
    ("bitcoin", Some("BTCUSDT")),
    ("ethereum", Some("ETHUSDT")),
    ("tether", None),
    ("binancecoin", Some("BNBUSDT")),
    ("cardano", Some("ADAUSDT")),
    ("ripple", Some("XRPUSDT")),
    ("solana", Some("SOLUSDT")),
    ("polkadot", Some("DOTUSDT")),
    ("dogecoin", Some("DOGEUSDT")),
    ("avalanche-2", Some("AVAXUSDT")),
];

/// Charts shorter than this keep default indicators.
const MIN_CHART_POINTS: usize = 51;
/// Trend and EMA distance need a full 200-day window.
const EMA_WINDOW: usize = 200;
const RSI_PERIOD: usize = 14;
const ADX_PERIOD: usize = 14;
const CMF_PERIOD: usize = 20;
const MACD_SLOPE_LOOKBACK: usize = 5;

pub struct CryptoService {
    ctx: Context,
}

impl CryptoService {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// USD prices for [`LIVE_PRICE_IDS`]. Empty if both providers fail.
    pub async fn live_prices(&self) -> Vec<PricePoint> {
        let sources = vec![
            Source::new("CoinGecko", 1, self.coingecko_prices()),
            Source::new("Binance", 2, self.binance_prices()),
        ];

        match fetch_with_fallback(sources, None).await {
            Ok(fetched) => fetched.data,
            Err(e) => {
                tracing::warn!("Live crypto prices unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Ranked rows for the configured coin ids.
    pub async fn fetch_markets(&self) -> Vec<CryptoData> {
        let pipeline = &self.ctx.settings.pipeline;
        let ids = &pipeline.crypto_ids;
        let batch_size = pipeline.crypto_batch_size.max(1);
        let total_batches = ids.len().div_ceil(batch_size);

        tracing::info!("Fetching {} coins in {} batches", ids.len(), total_batches);

        let mut markets = Vec::new();
        for (i, batch) in ids.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(pipeline.batch_delay_ms)).await;
            }
            match self.fetch_batch(batch).await {
                Ok(coins) => {
                    tracing::info!("Batch {}/{} fetched: {} coins", i + 1, total_batches, coins.len());
                    markets.extend(coins);
                }
                Err(e) => tracing::warn!("Skipping batch {}/{}: {}", i + 1, total_batches, e),
            }
        }

        if markets.is_empty() {
            tracing::error!("Failed to fetch any crypto market data");
            return Vec::new();
        }

        let mut rows = Vec::with_capacity(markets.len());
        for coin in markets {
            tokio::time::sleep(Duration::from_millis(pipeline.chart_delay_ms)).await;
            let chart = match self.fetch_chart(&coin.id).await {
                Ok(chart) => Some(chart),
                Err(e) => {
                    tracing::warn!("No chart for {}, using default indicators: {}", coin.id, e);
                    None
                }
            };

            if let Some(row) = build_row(coin, chart.as_ref(), pipeline.history_points) {
                tracing::info!(
                    "{}: ${:.2} | Score: {} | {}",
                    row.symbol,
                    row.current_price,
                    row.score,
                    row.recommendation
                );
                rows.push(row);
            }
        }

        tracing::info!("Processed {} coins", rows.len());
        rows
    }

    /// One `coins/markets` request; a 429 waits and retries once.
    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<CoinMarket>> {
        let joined = ids.join(",");
        match self.markets_request(&joined).await {
            Err(FeedError::Status { status: 429, .. }) => {
                let backoff = Duration::from_secs(self.ctx.settings.pipeline.rate_limit_backoff_secs);
                tracing::warn!("Rate limited by CoinGecko, waiting {:?}", backoff);
                tokio::time::sleep(backoff).await;
                self.markets_request(&joined).await
            }
            other => other,
        }
    }

    async fn markets_request(&self, ids: &str) -> Result<Vec<CoinMarket>> {
        let url = format!("{}/coins/markets", self.ctx.settings.endpoints.coingecko);
        self.ctx
            .http
            .get_json(
                &url,
                &[
                    ("vs_currency", "usd"),
                    ("ids", ids),
                    ("order", "market_cap_desc"),
                    ("sparkline", "false"),
                    ("price_change_percentage", "24h,7d,30d,1y"),
                ],
            )
            .await
    }

    async fn fetch_chart(&self, id: &str) -> Result<MarketChart> {
        let url = format!("{}/coins/{}/market_chart", self.ctx.settings.endpoints.coingecko, id);
        let days = self.ctx.settings.pipeline.chart_days.to_string();
        self.ctx
            .http
            .get_json(&url, &[("vs_currency", "usd"), ("days", days.as_str())])
            .await
    }

    async fn coingecko_prices(&self) -> Result<Option<Vec<PricePoint>>> {
        let ids: Vec<&str> = LIVE_PRICE_IDS.iter().map(|(id, _)| *id).collect();
        let url = format!("{}/simple/price", self.ctx.settings.endpoints.coingecko);
        let raw: Option<HashMap<String, HashMap<String, f64>>> = self
            .ctx
            .http
            .get_json_opt(&url, &[("ids", ids.join(",").as_str()), ("vs_currencies", "usd")])
            .await?;

        let prices: Vec<PricePoint> = ids
            .iter()
            .filter_map(|id| {
                let price = raw.as_ref()?.get(*id)?.get("usd")?;
                Some(PricePoint::new(id, *price))
            })
            .collect();

        Ok(Some(prices).filter(|p| !p.is_empty()))
    }

    async fn binance_prices(&self) -> Result<Option<Vec<PricePoint>>> {
        let url = format!("{}/api/v3/ticker/price", self.ctx.settings.endpoints.binance);
        let tickers: Vec<BinanceTicker> = self.ctx.http.get_json(&url, &[]).await?;

        let prices: Vec<PricePoint> = LIVE_PRICE_IDS
            .iter()
            .filter_map(|(id, pair)| {
                let pair = (*pair)?;
                let ticker = tickers.iter().find(|t| t.symbol == pair)?;
                let price = ticker.price.parse::<f64>().ok()?;
                Some(PricePoint::new(id, price))
            })
            .collect();

        Ok(Some(prices).filter(|p| !p.is_empty()))
    }
}

/// Indicator readings over a chronological daily close series.
///
/// Fewer than 51 closes yields the defaults (RSI 50, ADX 25, CMF 0,
/// neutral trend). Trend and EMA distance stay neutral below 200 closes.
pub fn coin_signals(closes: &[f64], volumes: Option<&[f64]>, change_24h: f64) -> CryptoSignals {
    let mut signals = CryptoSignals {
        change_24h,
        ..CryptoSignals::default()
    };
    if closes.len() < MIN_CHART_POINTS {
        return signals;
    }

    let price = closes[closes.len() - 1];
    let macd_line = macd(closes, 12, 26, 9).macd_line;
    let latest_macd = macd_line.last().copied().unwrap_or(0.0);

    signals.rsi = latest_rsi_chronological(closes, RSI_PERIOD).unwrap_or(50.0);
    signals.macd_slope = macd_slope(&macd_line, MACD_SLOPE_LOOKBACK);

    if closes.len() >= EMA_WINDOW {
        if let Some(ema_200) = ema(closes, EMA_WINDOW).last().copied() {
            signals.distance_from_200_ema = distance_from(price, ema_200);
            signals.trend = Trend::classify(price, ema_200, latest_macd);
        }
    }

    let volumes = volumes.filter(|v| v.len() == closes.len());
    let candles = Candles::synthesize(closes, volumes);
    let strength = adx(&candles, ADX_PERIOD);
    signals.adx = if strength.is_finite() { strength } else { DEFAULT_ADX };
    let flow = cmf(&candles, CMF_PERIOD);
    signals.cmf = if flow.is_finite() { flow } else { 0.0 };

    signals
}

fn build_row(coin: CoinMarket, chart: Option<&MarketChart>, history_points: usize) -> Option<CryptoData> {
    let current_price = coin.current_price.filter(|p| p.is_finite())?;
    let change_24h = coin.price_change_percentage_24h.unwrap_or(0.0);

    let (closes, volumes) = chart.map(MarketChart::series).unwrap_or_default();
    let signals = coin_signals(&closes, Some(volumes.as_slice()), change_24h);

    let score = crypto_score(&signals);
    let recommendation = crypto_recommendation(score, signals.trend);
    let history = chart
        .map(|c| c.history(history_points))
        .unwrap_or_default();

    Some(CryptoData {
        symbol: coin.symbol.to_uppercase(),
        id: coin.id,
        name: coin.name,
        image: coin.image.filter(|i| !i.is_empty()),
        current_price,
        market_cap: coin.market_cap,
        market_cap_rank: coin.market_cap_rank,
        total_volume: coin.total_volume,
        price_change_24h: change_24h,
        price_change_7d: coin.price_change_percentage_7d_in_currency,
        price_change_30d: coin.price_change_percentage_30d_in_currency,
        price_change_1y: coin.price_change_percentage_1y_in_currency,
        rsi: signals.rsi,
        adx: signals.adx,
        cmf: signals.cmf,
        distance_from_200_ema: signals.distance_from_200_ema,
        macd_slope: signals.macd_slope,
        trend: signals.trend,
        score,
        institutional_score: institutional_crypto_score(&signals),
        score_breakdown: score_breakdown(&signals),
        recommendation,
        reasons: crypto_reasons(&signals, recommendation),
        history,
    })
}

#[derive(Debug, Deserialize)]
struct CoinMarket {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    market_cap_rank: Option<u32>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d_in_currency: Option<f64>,
    price_change_percentage_30d_in_currency: Option<f64>,
    price_change_percentage_1y_in_currency: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<[f64; 2]>,
    #[serde(default)]
    total_volumes: Vec<[f64; 2]>,
}

impl MarketChart {
    fn series(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.prices.iter().map(|p| p[1]).collect(),
            self.total_volumes.iter().map(|v| v[1]).collect(),
        )
    }

    fn history(&self, points: usize) -> Vec<HistoryPoint> {
        let skip = self.prices.len().saturating_sub(points);
        self.prices
            .iter()
            .skip(skip)
            .filter_map(|[ts, price]| {
                let day = DateTime::from_timestamp_millis(*ts as i64)?;
                Some(HistoryPoint::new(day.format("%Y-%m-%d").to_string(), *price))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct BinanceTicker {
    symbol: String,
    price: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use investiq_core::CryptoRating;

    fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn test_short_chart_uses_defaults() {
        let signals = coin_signals(&rising(30), None, 3.5);

        assert_eq!(signals.rsi, 50.0);
        assert_eq!(signals.adx, DEFAULT_ADX);
        assert_eq!(signals.cmf, 0.0);
        assert_eq!(signals.trend, Trend::Neutral);
        assert_eq!(signals.change_24h, 3.5);
    }

    #[test]
    fn test_uptrend_is_bullish() {
        let signals = coin_signals(&rising(210), None, 1.0);

        assert_eq!(signals.trend, Trend::Bullish);
        assert!(signals.distance_from_200_ema > 0.0);
        assert!(signals.rsi > 70.0);
    }

    #[test]
    fn test_trend_needs_full_window() {
        let signals = coin_signals(&rising(120), None, 1.0);

        assert_eq!(signals.trend, Trend::Neutral);
        assert_eq!(signals.distance_from_200_ema, 0.0);
    }

    #[test]
    fn test_build_row_without_chart() {
        let coin: CoinMarket = serde_json::from_str(
            r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin","image":"",
                "current_price":65000.0,"market_cap":1.2e12,"market_cap_rank":1,
                "total_volume":3.0e10,"price_change_percentage_24h":2.0,
                "price_change_percentage_7d_in_currency":5.0}"#,
        )
        .unwrap();

        let row = build_row(coin, None, 90).unwrap();
        assert_eq!(row.symbol, "BTC");
        assert_eq!(row.image, None);
        assert_eq!(row.rsi, 50.0);
        assert!(row.history.is_empty());
        assert!(row.reasons.len() <= 5);
        assert_eq!(row.recommendation, crypto_recommendation(row.score, Trend::Neutral));
        assert_ne!(row.recommendation, CryptoRating::StrongBuy);
    }

    #[test]
    fn test_chart_history_keeps_latest_points() {
        let day_ms = 86_400_000.0;
        let chart = MarketChart {
            prices: (0..100)
                .map(|i| [1_735_689_600_000.0 + i as f64 * day_ms, i as f64])
                .collect(),
            total_volumes: Vec::new(),
        };

        let history = chart.history(90);
        assert_eq!(history.len(), 90);
        assert_eq!(history[0].value, 10.0);
        assert_eq!(history[89].value, 99.0);
        assert_eq!(history[0].time, "2025-01-11");
    }
}
