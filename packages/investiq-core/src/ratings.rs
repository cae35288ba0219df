//! Analyst-style rating split derived from company overview figures.

use serde::{Deserialize, Serialize};

/// Source label attached to derived ratings.
pub const DERIVED_SOURCE: &str = "Alpha Vantage (derived)";

/// Company overview figures the rating heuristic reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompanyOverview {
    pub pe_ratio: Option<f64>,
    /// Net profit margin as a fraction
    pub profit_margin: Option<f64>,
    pub analyst_target_price: Option<f64>,
    pub moving_average_50: Option<f64>,
    pub moving_average_200: Option<f64>,
}

impl CompanyOverview {
    pub fn is_empty(&self) -> bool {
        self.pe_ratio.is_none()
            && self.profit_margin.is_none()
            && self.analyst_target_price.is_none()
            && self.moving_average_50.is_none()
            && self.moving_average_200.is_none()
    }

    /// Reference price: the 50-day average, else the 200-day average.
    fn reference_price(&self) -> Option<f64> {
        self.moving_average_50
            .filter(|p| *p != 0.0)
            .or(self.moving_average_200)
            .filter(|p| *p != 0.0)
    }
}

/// Buy/hold/sell percentages summing to 100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedRatings {
    pub buy: u8,
    pub hold: u8,
    pub sell: u8,
    /// |buy - sell|, capped at 100
    pub confidence: u8,
    pub source: String,
}

/// Derive a rating split from valuation and profitability.
///
/// Starts at 33/34/33. More than 15% upside to the analyst target moves to
/// 60/30/10, more than 10% downside to 10/30/60. A margin above 15% adds 10
/// to buy, a negative margin 10 to sell. P/E under 12 adds 5 to buy, over 35
/// adds 5 to sell. Returns `None` for an empty overview.
pub fn derive_ratings(overview: &CompanyOverview) -> Option<NormalizedRatings> {
    if overview.is_empty() {
        return None;
    }

    let (mut buy, mut hold, mut sell) = (33.0_f64, 34.0_f64, 33.0_f64);

    let target = overview.analyst_target_price.unwrap_or(0.0);
    if let Some(price) = overview.reference_price() {
        if target != 0.0 {
            let upside = (target - price) / price;
            if upside > 0.15 {
                (buy, hold, sell) = (60.0, 30.0, 10.0);
            } else if upside < -0.1 {
                (buy, hold, sell) = (10.0, 30.0, 60.0);
            }
        }
    }

    let margin = overview.profit_margin.unwrap_or(0.0);
    if margin > 0.15 {
        buy += 10.0;
    } else if margin < 0.0 {
        sell += 10.0;
    }

    let pe = overview.pe_ratio.unwrap_or(0.0);
    if pe > 0.0 && pe < 12.0 {
        buy += 5.0;
    } else if pe > 35.0 {
        sell += 5.0;
    }

    let total = buy + hold + sell;
    let buy = (buy / total * 100.0).round();
    let hold = (hold / total * 100.0).round();
    let sell = (100.0 - buy - hold).max(0.0);
    let confidence = (buy - sell).abs().round().min(100.0);

    Some(NormalizedRatings {
        buy: buy as u8,
        hold: hold as u8,
        sell: sell as u8,
        confidence: confidence as u8,
        source: DERIVED_SOURCE.to_string(),
    })
}
