//! Per-metric read-outs of a ranked row against ideal ranges and grades.

use serde::Serialize;

use super::ranges::{
    format_ideal_range, format_percent, ideal_range, is_in_ideal_range, Polarity, Tier,
};
use super::{Grade, GradedMetric};
use crate::types::{AssetKind, CryptoData, StockData};

/// One metric of a stock or coin, rated for display.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricAssessment {
    pub metric: &'static str,
    pub label: &'static str,
    pub value: f64,
    pub display: String,
    /// "Ideal: 10-25", "Target: 30" and so on; empty without a range
    pub ideal: String,
    pub in_range: bool,
    pub tier: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
}

impl MetricAssessment {
    fn new(metric: &'static str, value: f64, kind: AssetKind, grade: Option<Grade>) -> Self {
        let range = ideal_range(metric, kind);
        Self {
            metric,
            label: range.map(|r| r.description).unwrap_or(metric),
            value,
            display: format!("{:.2}", value),
            ideal: format_ideal_range(metric, kind),
            in_range: is_in_ideal_range(value, metric, kind),
            tier: Tier::rate(value, Polarity::Positive, range.as_ref()),
            grade,
        }
    }

    fn change(metric: &'static str, value: f64) -> Self {
        Self {
            display: format_percent(value),
            ..Self::new(metric, value, AssetKind::Crypto, Some(Grade::of_change(value)))
        }
    }
}

/// Every known fundamental and momentum metric of a stock row.
/// Missing and non-finite values are skipped.
pub fn assess_stock(stock: &StockData) -> Vec<MetricAssessment> {
    let f = &stock.fundamentals;
    let readings = [
        ("pe_ratio", f.pe_ratio, None),
        ("forward_pe", f.forward_pe, None),
        ("peg_ratio", f.peg_ratio, None),
        ("price_to_book", f.price_to_book, None),
        ("roce", f.roce, Some(GradedMetric::Roce)),
        ("eps_growth", f.eps_growth, Some(GradedMetric::Eps)),
        ("debt_to_equity", f.debt_to_equity, None),
        ("debt_to_ebitda", f.debt_to_ebitda, Some(GradedMetric::Debt)),
        ("ev_to_ebitda", f.ev_to_ebitda, None),
        ("fcf_yield", f.fcf_yield, Some(GradedMetric::Fcf)),
        ("operating_margins", f.operating_margins, None),
        ("price_6m_return", stock.price_6m_return, Some(GradedMetric::Return)),
        ("rsi", stock.rsi, None),
        ("score", Some(f64::from(stock.score)), Some(GradedMetric::Score)),
    ];

    readings
        .into_iter()
        .filter_map(|(metric, value, graded)| {
            let value = value.filter(|v| v.is_finite())?;
            let grade = graded.map(|g| Grade::of(value, g));
            Some(MetricAssessment::new(metric, value, AssetKind::Stock, grade))
        })
        .collect()
}

/// RSI, score and price changes of a coin row.
pub fn assess_crypto(coin: &CryptoData) -> Vec<MetricAssessment> {
    let score = f64::from(coin.score);
    let mut metrics = vec![
        MetricAssessment::new("rsi", coin.rsi, AssetKind::Crypto, None),
        MetricAssessment::new(
            "score",
            score,
            AssetKind::Crypto,
            Some(Grade::of(score, GradedMetric::Score)),
        ),
        MetricAssessment::change("price_change_24h", coin.price_change_24h),
    ];
    metrics.extend(
        [
            ("price_change_7d", coin.price_change_7d),
            ("price_change_1y", coin.price_change_1y),
        ]
        .into_iter()
        .filter_map(|(metric, value)| Some(MetricAssessment::change(metric, value?))),
    );

    metrics.retain(|m| m.value.is_finite());
    metrics
}
