//! Company fundamentals and derived analyst ratings from Alpha Vantage.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use investiq_core::ratings::{derive_ratings, CompanyOverview, NormalizedRatings};
use investiq_core::Fundamentals;

use super::{parse_number, require_key, Context, ALPHA_VANTAGE_LIMIT};
use crate::{FeedError, Result};

/// Alpha Vantage OVERVIEW, mapped twice: once for scoring, once for ratings.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyProfile {
    pub symbol: String,
    pub fundamentals: Fundamentals,
    pub overview: CompanyOverview,
}

pub struct RatingsService {
    ctx: Context,
}

impl RatingsService {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    pub fn is_configured(&self) -> bool {
        self.ctx.settings.api_keys.alpha_vantage.is_some()
    }

    /// Fetch the OVERVIEW document for `symbol`.
    pub async fn fetch_overview(&self, symbol: &str) -> Result<CompanyProfile> {
        let key = require_key(&self.ctx.settings.api_keys.alpha_vantage, "Alpha Vantage")?;
        let symbol = symbol.trim().to_uppercase();
        self.ctx.throttle(ALPHA_VANTAGE_LIMIT).await;

        let url = format!("{}/query", self.ctx.settings.endpoints.alpha_vantage);
        let raw: Option<HashMap<String, Value>> = self
            .ctx
            .http
            .get_json_opt(
                &url,
                &[
                    ("function", "OVERVIEW"),
                    ("symbol", symbol.as_str()),
                    ("apikey", key.as_str()),
                ],
            )
            .await?;

        let raw = raw.unwrap_or_default();
        if let Some(note) = raw.get("Note").or_else(|| raw.get("Information")) {
            return Err(FeedError::RateLimited(
                note.as_str().unwrap_or_default().to_string(),
            ));
        }
        if raw.is_empty() {
            return Err(FeedError::NoData(format!("no overview for {}", symbol)));
        }

        Ok(CompanyProfile {
            fundamentals: fundamentals_from_overview(&raw),
            overview: overview_figures(&raw),
            symbol,
        })
    }

    /// Buy/hold/sell split derived from the overview. `None` without a key,
    /// on fetch failure, or when the overview carries no usable figures.
    pub async fn analyst_ratings(&self, symbol: &str) -> Option<NormalizedRatings> {
        if !self.is_configured() {
            return None;
        }

        match self.fetch_overview(symbol).await {
            Ok(profile) => derive_ratings(&profile.overview),
            Err(e) => {
                tracing::warn!("Alpha Vantage ratings fetch failed for {}: {}", symbol, e);
                None
            }
        }
    }
}

fn number(raw: &HashMap<String, Value>, field: &str) -> Option<f64> {
    match raw.get(field)? {
        Value::String(s) => parse_number(s),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn text(raw: &HashMap<String, Value>, field: &str) -> Option<String> {
    raw.get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None")
        .map(str::to_string)
}

fn percent(raw: &HashMap<String, Value>, field: &str) -> Option<f64> {
    number(raw, field).map(|v| v * 100.0)
}

fn fundamentals_from_overview(raw: &HashMap<String, Value>) -> Fundamentals {
    Fundamentals {
        name: text(raw, "Name"),
        sector: text(raw, "Sector"),
        industry: text(raw, "Industry"),
        market_cap: number(raw, "MarketCapitalization"),
        pe_ratio: number(raw, "PERatio"),
        forward_pe: number(raw, "ForwardPE"),
        peg_ratio: number(raw, "PEGRatio"),
        price_to_book: number(raw, "PriceToBookRatio"),
        roce: percent(raw, "ReturnOnEquityTTM"),
        eps_growth: percent(raw, "QuarterlyEarningsGrowthYOY"),
        ev_to_ebitda: number(raw, "EVToEBITDA"),
        operating_margins: percent(raw, "OperatingMarginTTM"),
        profit_margin: number(raw, "ProfitMargin"),
        ebitda: number(raw, "EBITDA"),
        institutional_holding: number(raw, "PercentInstitutions"),
        analyst_target_price: number(raw, "AnalystTargetPrice"),
        moving_average_50: number(raw, "50DayMovingAverage"),
        moving_average_200: number(raw, "200DayMovingAverage"),
        ..Fundamentals::default()
    }
}

fn overview_figures(raw: &HashMap<String, Value>) -> CompanyOverview {
    CompanyOverview {
        pe_ratio: number(raw, "PERatio"),
        profit_margin: number(raw, "ProfitMargin"),
        analyst_target_price: number(raw, "AnalystTargetPrice"),
        moving_average_50: number(raw, "50DayMovingAverage"),
        moving_average_200: number(raw, "200DayMovingAverage"),
    }
}
