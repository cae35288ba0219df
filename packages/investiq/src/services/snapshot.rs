//! Snapshot pipeline: fetch everything, score it and write `latest_data.json`.
//!
//! The snapshot is what the app shows in hybrid mode. Reading it never fails:
//! a missing or unreadable file gives an empty snapshot stamped now.

use futures::future::join_all;
use std::fs;
use std::path::Path;
use tokio::time::Instant;

use investiq_core::indicators::DEFAULT_ADX;
use investiq_core::types::finite;
use investiq_core::{CryptoData, Fundamentals, Market, MarketSnapshot, StockData};

use super::{Context, CryptoService, HistoryRange, NewsService, RatingsService, StockService};
use crate::Result;

pub struct SnapshotPipeline {
    ctx: Context,
    stocks: StockService,
    crypto: CryptoService,
    news: NewsService,
    ratings: RatingsService,
}

impl SnapshotPipeline {
    pub fn new(ctx: Context) -> Self {
        Self {
            stocks: StockService::new(ctx.clone()),
            crypto: CryptoService::new(ctx.clone()),
            news: NewsService::new(ctx.clone()),
            ratings: RatingsService::new(ctx.clone()),
            ctx,
        }
    }

    /// Fetch stocks, crypto and news concurrently and build a ranked snapshot.
    pub async fn generate(&self) -> MarketSnapshot {
        let pipeline = &self.ctx.settings.pipeline;
        let start = Instant::now();
        tracing::info!("Generating market snapshot");

        let (nifty_50, us_stocks, crypto, news) = tokio::join!(
            self.stock_rows(Market::India, pipeline.india_limit),
            self.stock_rows(Market::Us, pipeline.us_limit),
            self.crypto.fetch_markets(),
            self.news
                .fetch_category_news(pipeline.news_per_feed, pipeline.news_limit),
        );

        let mut snapshot = MarketSnapshot {
            last_updated: chrono::Utc::now(),
            nifty_50,
            us_stocks,
            crypto,
            news,
        };
        sanitize(&mut snapshot);

        tracing::info!(
            "Snapshot ready in {:.1}s: {} India, {} US, {} crypto, {} news",
            start.elapsed().as_secs_f64(),
            snapshot.nifty_50.len(),
            snapshot.us_stocks.len(),
            snapshot.crypto.len(),
            snapshot.news.len()
        );
        snapshot
    }

    /// Generate and write the snapshot to the configured path.
    pub async fn generate_and_write(&self) -> Result<MarketSnapshot> {
        let snapshot = self.generate().await;
        write(&snapshot, &self.ctx.settings.snapshot_path())?;
        Ok(snapshot)
    }

    /// Read a snapshot from a file path or an http(s) URL.
    pub async fn load(&self, source: &str) -> MarketSnapshot {
        let body = if source.starts_with("http://") || source.starts_with("https://") {
            self.ctx.http.get_text(source, &[]).await
        } else {
            fs::read_to_string(source).map_err(Into::into)
        };

        let parsed = body.and_then(|b| Ok(serde_json::from_str::<MarketSnapshot>(&b)?));
        match parsed {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Failed to load snapshot from {}: {}", source, e);
                MarketSnapshot::empty()
            }
        }
    }

    /// Quotes for one market, enriched and sorted by score, best first.
    async fn stock_rows(&self, market: Market, limit: usize) -> Vec<StockData> {
        let rows = self.stocks.fetch_market(market, limit).await;
        let mut rows = join_all(rows.into_iter().map(|row| self.enrich(row))).await;
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        rows
    }

    async fn enrich(&self, row: StockData) -> StockData {
        let history = self
            .stocks
            .fetch_history(&row.symbol, row.market, HistoryRange::OneYear)
            .await;

        let mut row = match history {
            Ok(history) => {
                let keep = self.ctx.settings.pipeline.history_points;
                let mut row = row.with_history(history);
                let skip = row.history.len().saturating_sub(keep);
                row.history.drain(..skip);
                row
            }
            Err(e) => {
                tracing::warn!("No history for {}: {}", row.symbol, e);
                row
            }
        };

        if self.ratings.is_configured() {
            match self.ratings.fetch_overview(&row.symbol).await {
                Ok(profile) => row = row.with_fundamentals(profile.fundamentals),
                Err(e) => tracing::warn!("No fundamentals for {}: {}", row.symbol, e),
            }
        }

        row
    }
}

/// Write `snapshot` as pretty JSON, creating parent directories.
pub fn write(snapshot: &MarketSnapshot, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    tracing::info!("Snapshot written to {}", path.display());
    Ok(())
}

/// Replace non-finite metrics so the written JSON reads back: optional ones
/// become `None`, required ones fall back to their neutral value.
pub fn sanitize(snapshot: &mut MarketSnapshot) {
    for row in snapshot.nifty_50.iter_mut().chain(snapshot.us_stocks.iter_mut()) {
        sanitize_stock(row);
    }
    for coin in snapshot.crypto.iter_mut() {
        sanitize_coin(coin);
    }
}

fn scrub(value: &mut Option<f64>) {
    *value = value.and_then(finite);
}

fn settle(value: &mut f64, fallback: f64) {
    if !value.is_finite() {
        *value = fallback;
    }
}

fn sanitize_stock(row: &mut StockData) {
    settle(&mut row.current_price, 0.0);
    settle(&mut row.change, 0.0);
    settle(&mut row.change_percent, 0.0);
    scrub(&mut row.volume);
    scrub(&mut row.price_6m_return);
    scrub(&mut row.rsi);
    sanitize_fundamentals(&mut row.fundamentals);
    row.history.retain(|p| p.value.is_finite());
}

fn sanitize_fundamentals(f: &mut Fundamentals) {
    for value in [
        &mut f.market_cap,
        &mut f.pe_ratio,
        &mut f.forward_pe,
        &mut f.peg_ratio,
        &mut f.price_to_book,
        &mut f.roce,
        &mut f.eps_growth,
        &mut f.debt_to_equity,
        &mut f.debt_to_ebitda,
        &mut f.ev_to_ebitda,
        &mut f.fcf_yield,
        &mut f.operating_margins,
        &mut f.profit_margin,
        &mut f.ebitda,
        &mut f.free_cashflow,
        &mut f.institutional_holding,
        &mut f.analyst_target_price,
        &mut f.moving_average_50,
        &mut f.moving_average_200,
    ] {
        scrub(value);
    }
}

fn sanitize_coin(coin: &mut CryptoData) {
    settle(&mut coin.current_price, 0.0);
    settle(&mut coin.price_change_24h, 0.0);
    settle(&mut coin.rsi, 50.0);
    settle(&mut coin.adx, DEFAULT_ADX);
    settle(&mut coin.cmf, 0.0);
    settle(&mut coin.distance_from_200_ema, 0.0);
    settle(&mut coin.macd_slope, 0.0);
    scrub(&mut coin.market_cap);
    scrub(&mut coin.total_volume);
    scrub(&mut coin.price_change_7d);
    scrub(&mut coin.price_change_30d);
    scrub(&mut coin.price_change_1y);
    coin.history.retain(|p| p.value.is_finite());
}
