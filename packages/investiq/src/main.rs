//! InvestIQ CLI - market data, news, crypto and local bookkeeping.
//!
//! Every command prints an `ApiResponse` as JSON on stdout. Logs go to stderr.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{watch, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use investiq::refresh::AutoRefresh;
use investiq::services::{
    Context, CryptoService, HistoryRange, NewsService, RatingsService, SnapshotPipeline,
    StockService,
};
use investiq::Settings;
use investiq_core::alerts::{AlertBook, AlertCondition, NewAlert};
use investiq_core::favorites::FavoritesBook;
use investiq_core::portfolio::{NewPosition, PortfolioBook};
use investiq_core::ratings::derive_ratings;
use investiq_core::store::{JsonFileStore, KeyValueStore};
use investiq_core::{ApiResponse, AssetKind, Market, PricePoint};

#[derive(Parser)]
#[command(name = "investiq")]
#[command(about = "InvestIQ CLI - stocks, crypto, news, alerts and a simulated portfolio")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Latest quote for a stock
    Quote {
        symbol: String,
        /// us or india
        #[arg(short, long, default_value = "us")]
        market: Market,
    },
    /// Quotes for a market's tracked symbols
    Stocks {
        #[arg(short, long, default_value = "us")]
        market: Market,
        /// Number of symbols (defaults to the pipeline limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Daily closes
    History {
        symbol: String,
        #[arg(short, long, default_value = "us")]
        market: Market,
        /// 1mo, 3mo, 6mo, 1y, 2y or 5y
        #[arg(short, long, default_value = "1y")]
        range: HistoryRange,
    },
    /// RSI, moving averages and signal for a stock
    Analyze {
        symbol: String,
        #[arg(short, long, default_value = "us")]
        market: Market,
        #[arg(short, long, default_value = "1y")]
        range: HistoryRange,
    },
    /// Market headlines
    News {
        /// Merge the per-category RSS feeds instead of the provider chain
        #[arg(long)]
        categories: bool,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Crypto commands
    Crypto {
        #[command(subcommand)]
        action: CryptoAction,
    },
    /// Fundamentals and derived analyst ratings
    Ratings { symbol: String },
    /// Ideal ranges, tiers and grades of a snapshot row
    Metrics {
        /// Stock symbol, or coin id or symbol
        id: String,
        /// Snapshot path or URL (defaults to the configured source)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Snapshot commands
    Snapshot {
        #[command(subcommand)]
        action: SnapshotAction,
    },
    /// Favorite stocks and coins
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Price alerts
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },
    /// Simulated portfolio
    Portfolio {
        #[command(subcommand)]
        action: PortfolioAction,
    },
    /// Check alerts and revalue the portfolio on every refresh until Ctrl-C
    Watch {
        /// Seconds between refreshes (defaults to the config value)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
enum CryptoAction {
    /// Live USD prices
    Prices,
    /// Scored market rows
    Markets,
}

#[derive(Subcommand)]
enum SnapshotAction {
    /// Fetch everything and write latest_data.json
    Generate,
    /// Read a snapshot from a path or URL
    Show {
        /// Defaults to the configured snapshot source
        source: Option<String>,
    },
}

#[derive(Subcommand)]
enum FavoritesAction {
    List,
    /// Add or remove a favorite
    Toggle {
        /// Stock symbol or coin id
        id: String,
        #[arg(short, long, default_value = "stock")]
        kind: AssetKind,
    },
    Clear,
}

#[derive(Subcommand)]
enum AlertsAction {
    List,
    /// Create an alert
    Add {
        /// Stock symbol or coin id
        symbol: String,
        /// Target price
        #[arg(short, long)]
        target: f64,
        /// above or below
        #[arg(short = 'w', long, default_value = "above")]
        condition: AlertCondition,
        #[arg(short, long, default_value = "stock")]
        kind: AssetKind,
        /// Display name (defaults to the symbol)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Remove an alert
    Remove { id: String },
    /// Fetch prices and fire alerts whose condition is met
    Check {
        /// Use the prices of the configured snapshot instead of live quotes
        #[arg(long)]
        from_snapshot: bool,
    },
    Clear,
}

#[derive(Subcommand)]
enum PortfolioAction {
    /// Positions and summary
    List,
    /// Open a position
    Add {
        /// Stock symbol or coin id
        symbol: String,
        #[arg(short = 'n', long)]
        quantity: f64,
        /// Buy price per unit
        #[arg(short, long)]
        price: f64,
        #[arg(short, long, default_value = "stock")]
        kind: AssetKind,
        #[arg(long)]
        name: Option<String>,
    },
    /// Close a position
    Remove { id: String },
    /// Revalue positions at current prices
    Refresh {
        /// Use the prices of the configured snapshot instead of live quotes
        #[arg(long)]
        from_snapshot: bool,
    },
    Clear,
}

#[tokio::main]
async fn main() {
    // Logs on stderr keep stdout parseable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match App::new(cli.config) {
        Ok(app) => app.run(cli.command).await,
        Err(e) => Err(e),
    };

    let code = exit_code(&result);
    println!("{}", render(result));
    if code != 0 {
        std::process::exit(code);
    }
}

/// 1 when the command failed and printed `ok: false`.
fn exit_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn render<T: Serialize>(result: Result<T>) -> String {
    let rendered = match result {
        Ok(data) => serde_json::to_string_pretty(&ApiResponse::ok(data)),
        Err(e) => serde_json::to_string_pretty(&ApiResponse::<()>::err(format!("{:#}", e))),
    };
    rendered.unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }).to_string())
}

/// One-line variant of [`render`] for streamed output.
fn render_line<T: Serialize>(result: Result<T>) -> String {
    let rendered = match result {
        Ok(data) => serde_json::to_string(&ApiResponse::ok(data)),
        Err(e) => serde_json::to_string(&ApiResponse::<()>::err(format!("{:#}", e))),
    };
    rendered.unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }).to_string())
}

/// Services and stores shared by the commands.
struct App {
    ctx: Context,
    store: Arc<dyn KeyValueStore>,
    stocks: StockService,
    crypto: CryptoService,
}

impl App {
    fn new(config: Option<PathBuf>) -> Result<Self> {
        let settings = Settings::load(config.as_deref()).context("Failed to load settings")?;
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(settings.data_dir()));
        let ctx = Context::new(settings)?;

        Ok(Self {
            stocks: StockService::new(ctx.clone()),
            crypto: CryptoService::new(ctx.clone()),
            ctx,
            store,
        })
    }

    async fn run(self, command: Commands) -> Result<Value> {
        match command {
            Commands::Quote { symbol, market } => {
                Ok(json!(self.stocks.fetch_quote(&symbol, market).await?))
            }
            Commands::Stocks { market, limit } => {
                let pipeline = &self.ctx.settings.pipeline;
                let limit = limit.unwrap_or(match market {
                    Market::India => pipeline.india_limit,
                    Market::Us => pipeline.us_limit,
                });
                let stocks = self.stocks.fetch_market(market, limit).await;
                Ok(json!({ "market": market, "count": stocks.len(), "stocks": stocks }))
            }
            Commands::History {
                symbol,
                market,
                range,
            } => {
                let history = self.stocks.fetch_history(&symbol, market, range).await?;
                Ok(json!({ "symbol": symbol.to_uppercase(), "range": range, "history": history }))
            }
            Commands::Analyze {
                symbol,
                market,
                range,
            } => Ok(json!(self.stocks.analyze(&symbol, market, range).await?)),
            Commands::News { categories, limit } => self.news(categories, limit).await,
            Commands::Crypto { action } => match action {
                CryptoAction::Prices => Ok(json!({ "prices": self.crypto.live_prices().await })),
                CryptoAction::Markets => {
                    let markets = self.crypto.fetch_markets().await;
                    Ok(json!({ "count": markets.len(), "crypto": markets }))
                }
            },
            Commands::Ratings { symbol } => {
                let profile = RatingsService::new(self.ctx.clone())
                    .fetch_overview(&symbol)
                    .await?;
                let ratings = derive_ratings(&profile.overview);
                Ok(json!({
                    "symbol": profile.symbol,
                    "fundamentals": profile.fundamentals,
                    "ratings": ratings,
                }))
            }
            Commands::Metrics { id, source } => {
                let source = source.unwrap_or_else(|| self.ctx.settings.snapshot_source());
                let snapshot = SnapshotPipeline::new(self.ctx.clone()).load(&source).await;
                let metrics = snapshot
                    .assess(&id)
                    .with_context(|| format!("{} is not in the snapshot at {}", id, source))?;
                Ok(json!({ "id": id, "metrics": metrics }))
            }
            Commands::Snapshot { action } => {
                let pipeline = SnapshotPipeline::new(self.ctx.clone());
                match action {
                    SnapshotAction::Generate => {
                        let snapshot = pipeline.generate_and_write().await?;
                        Ok(json!({
                            "path": self.ctx.settings.snapshot_path(),
                            "last_updated": snapshot.last_updated,
                            "nifty_50": snapshot.nifty_50.len(),
                            "us_stocks": snapshot.us_stocks.len(),
                            "crypto": snapshot.crypto.len(),
                            "news": snapshot.news.len(),
                        }))
                    }
                    SnapshotAction::Show { source } => {
                        let source = source.unwrap_or_else(|| self.ctx.settings.snapshot_source());
                        Ok(json!(pipeline.load(&source).await))
                    }
                }
            }
            Commands::Favorites { action } => self.favorites(action),
            Commands::Alerts { action } => self.alerts(action).await,
            Commands::Portfolio { action } => self.portfolio(action).await,
            Commands::Watch { interval } => self.watch(interval).await,
        }
    }

    async fn news(&self, categories: bool, limit: Option<usize>) -> Result<Value> {
        let service = NewsService::new(self.ctx.clone());
        if categories {
            let pipeline = &self.ctx.settings.pipeline;
            let news = service
                .fetch_category_news(pipeline.news_per_feed, limit.unwrap_or(pipeline.news_limit))
                .await;
            return Ok(json!({ "source": "RSS Categories", "news": news }));
        }

        let mut fetched = service.fetch_news().await?;
        if let Some(limit) = limit {
            fetched.data.truncate(limit);
        }
        Ok(json!({ "source": fetched.source, "news": fetched.data }))
    }

    fn favorites(&self, action: FavoritesAction) -> Result<Value> {
        let mut book = FavoritesBook::load(self.store.clone());
        match action {
            FavoritesAction::List => Ok(json!(book.favorites())),
            FavoritesAction::Toggle { id, kind } => {
                let favorite = book.toggle(&id, kind)?;
                Ok(json!({ "id": id, "kind": kind, "favorite": favorite }))
            }
            FavoritesAction::Clear => {
                book.clear()?;
                Ok(json!({ "cleared": true }))
            }
        }
    }

    async fn alerts(&self, action: AlertsAction) -> Result<Value> {
        let mut book = AlertBook::load(self.store.clone());
        match action {
            AlertsAction::List => Ok(json!({ "alerts": book.alerts() })),
            AlertsAction::Add {
                symbol,
                target,
                condition,
                kind,
                name,
            } => {
                let symbol = symbol.trim().to_uppercase();
                let prices = self.prices(&[(symbol.clone(), kind)]).await;
                let current_price = prices
                    .iter()
                    .find(|p| p.symbol.eq_ignore_ascii_case(&symbol))
                    .map(|p| p.price)
                    .unwrap_or_default();
                let alert = book.add(NewAlert {
                    name: name.unwrap_or_else(|| symbol.clone()),
                    symbol,
                    kind,
                    target_price: target,
                    condition,
                    current_price,
                })?;
                Ok(json!({ "alert": alert }))
            }
            AlertsAction::Remove { id } => {
                let removed = book.remove(&id)?;
                if !removed {
                    anyhow::bail!("Alert not found: {}", id);
                }
                Ok(json!({ "removed": id }))
            }
            AlertsAction::Check { from_snapshot } => {
                let prices = if from_snapshot {
                    self.snapshot_prices().await
                } else {
                    let watched: Vec<(String, AssetKind)> = book
                        .alerts()
                        .iter()
                        .filter(|a| !a.triggered)
                        .map(|a| (a.symbol.clone(), a.kind))
                        .collect();
                    self.prices(&watched).await
                };
                let notifications = book.check(&prices)?;
                Ok(json!({ "notifications": notifications, "alerts": book.alerts() }))
            }
            AlertsAction::Clear => {
                book.clear()?;
                Ok(json!({ "cleared": true }))
            }
        }
    }

    async fn portfolio(&self, action: PortfolioAction) -> Result<Value> {
        let mut book = PortfolioBook::load(self.store.clone());
        match action {
            PortfolioAction::List => Ok(json!({
                "positions": book.positions(),
                "summary": book.summary(),
            })),
            PortfolioAction::Add {
                symbol,
                quantity,
                price,
                kind,
                name,
            } => {
                let symbol = symbol.trim().to_uppercase();
                let position = book.add_position(NewPosition {
                    name: name.unwrap_or_else(|| symbol.clone()),
                    symbol,
                    kind,
                    quantity,
                    buy_price: price,
                    buy_date: None,
                })?;
                Ok(json!({ "position": position }))
            }
            PortfolioAction::Remove { id } => {
                let removed = book.remove_position(&id)?;
                Ok(json!({ "removed": removed }))
            }
            PortfolioAction::Refresh { from_snapshot } => {
                let prices = if from_snapshot {
                    self.snapshot_prices().await
                } else {
                    let held: Vec<(String, AssetKind)> = book
                        .positions()
                        .iter()
                        .map(|p| (p.symbol.clone(), p.kind))
                        .collect();
                    self.prices(&held).await
                };
                let updated = book.update_prices(&prices)?;
                Ok(json!({
                    "updated": updated,
                    "positions": book.positions(),
                    "summary": book.summary(),
                }))
            }
            PortfolioAction::Clear => {
                book.clear()?;
                Ok(json!({ "cleared": true }))
            }
        }
    }

    /// Print a line per refresh until Ctrl-C.
    async fn watch(self, interval: Option<u64>) -> Result<Value> {
        let mut settings = self.ctx.settings.refresh.clone();
        if let Some(secs) = interval {
            settings.interval_secs = secs;
            settings.enabled = true;
        }
        let refresh = AutoRefresh::from_settings(&settings);
        if !refresh.is_enabled() {
            anyhow::bail!("Auto refresh is disabled in the config");
        }

        tracing::info!("Watching every {:?}, Ctrl-C to stop", refresh.interval());
        let store = self.store.clone();
        let app = Arc::new(self);
        let books = Arc::new(Mutex::new((
            AlertBook::load(store.clone()),
            PortfolioBook::load(store),
        )));

        let cycle = {
            let app = app.clone();
            let books = books.clone();
            move || {
                let app = app.clone();
                let books = books.clone();
                async move {
                    println!("{}", render_line(app.watch_cycle(&books).await));
                }
            }
        };

        let (visible_tx, visible_rx) = watch::channel(true);
        cycle().await;

        tokio::select! {
            _ = refresh.run(visible_rx, cycle) => {}
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
            }
        }
        drop(visible_tx);

        Ok(json!({ "stopped": true }))
    }

    async fn watch_cycle(&self, books: &Mutex<(AlertBook, PortfolioBook)>) -> Result<Value> {
        let mut books = books.lock().await;
        let (alerts, portfolio) = &mut *books;

        let mut watched: Vec<(String, AssetKind)> = alerts
            .alerts()
            .iter()
            .filter(|a| !a.triggered)
            .map(|a| (a.symbol.clone(), a.kind))
            .collect();
        watched.extend(portfolio.positions().iter().map(|p| (p.symbol.clone(), p.kind)));

        let prices = self.prices(&watched).await;
        let notifications = alerts.check(&prices)?;
        for n in &notifications {
            tracing::info!("{}: {}", n.title, n.body);
        }
        portfolio.update_prices(&prices)?;

        Ok(json!({
            "checked_at": chrono::Utc::now(),
            "prices": prices,
            "notifications": notifications,
            "portfolio": portfolio.summary(),
        }))
    }

    async fn snapshot_prices(&self) -> Vec<PricePoint> {
        let source = self.ctx.settings.snapshot_source();
        SnapshotPipeline::new(self.ctx.clone())
            .load(&source)
            .await
            .price_points()
    }

    /// Current prices for `wanted`. Stocks are quoted one by one; coins come
    /// from a single live-price call. Symbols without a price are left out.
    async fn prices(&self, wanted: &[(String, AssetKind)]) -> Vec<PricePoint> {
        let stocks: BTreeSet<String> = wanted
            .iter()
            .filter(|(_, kind)| *kind == AssetKind::Stock)
            .map(|(symbol, _)| symbol.to_uppercase())
            .collect();
        let wants_crypto = wanted.iter().any(|(_, kind)| *kind == AssetKind::Crypto);

        let quotes = join_all(
            stocks
                .iter()
                .map(|symbol| self.stocks.fetch_quote(symbol, market_for(symbol))),
        )
        .await;

        let mut prices: Vec<PricePoint> = stocks
            .iter()
            .zip(quotes)
            .filter_map(|(symbol, quote)| match quote {
                Ok(quote) => Some(PricePoint::new(symbol, quote.price)),
                Err(e) => {
                    tracing::warn!("No price for {}: {}", symbol, e);
                    None
                }
            })
            .collect();

        if wants_crypto {
            prices.extend(self.crypto.live_prices().await);
        }
        prices
    }
}

/// Tracked NIFTY 50 symbols are quoted on NSE, everything else as US.
fn market_for(symbol: &str) -> Market {
    if Market::India.symbols().contains(&symbol) {
        Market::India
    } else {
        Market::Us
    }
}
