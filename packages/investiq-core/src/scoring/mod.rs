//! Composite scores and recommendation labels.
//!
//! - **Stocks**: weighted fundamentals plus momentum, see [`stock_composite_score`]
//! - **Crypto**: technical readings, see [`crypto_score`] and [`institutional_crypto_score`]
//! - **Ranges**: ideal bands per metric and a relative [`Tier`] rating
//! - **Assessment**: every metric of a row rated at once, see [`assess_stock`]

mod assess;
mod crypto;
mod ranges;
mod stock;

pub use assess::{assess_crypto, assess_stock, MetricAssessment};
pub use crypto::{
    crypto_reasons, crypto_recommendation, crypto_score, institutional_crypto_score,
    score_breakdown, CryptoRating, CryptoSignals, Trend,
};
pub use ranges::{
    format_ideal_range, format_percent, ideal_range, is_in_ideal_range, percentile, IdealRange,
    Polarity, Tier,
};
pub use stock::{earnings_quality, stock_composite_score, stock_reasons, EarningsQuality};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recommendation derived from a 0-100 composite score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Recommendation {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    Buy,
    Hold,
    Reduce,
    Avoid,
}

impl Recommendation {
    /// ≥80 Strong Buy, ≥65 Buy, ≥45 Hold, ≥30 Reduce, otherwise Avoid.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Recommendation::StrongBuy,
            65..=79 => Recommendation::Buy,
            45..=64 => Recommendation::Hold,
            30..=44 => Recommendation::Reduce,
            _ => Recommendation::Avoid,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Recommendation::StrongBuy => "Strong Buy",
            Recommendation::Buy => "Buy",
            Recommendation::Hold => "Hold",
            Recommendation::Reduce => "Reduce",
            Recommendation::Avoid => "Avoid",
        };
        write!(f, "{}", label)
    }
}

/// Metrics that have fixed good/acceptable thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GradedMetric {
    Roce,
    Eps,
    Fcf,
    Debt,
    Return,
    Esg,
    Score,
}

/// Three-level grade of a metric value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Success,
    Warning,
    Error,
}

impl Grade {
    pub fn of(value: f64, metric: GradedMetric) -> Self {
        // (success, warning) thresholds; debt is lower-is-better
        let (good, fair) = match metric {
            GradedMetric::Roce => (20.0, 12.0),
            GradedMetric::Eps => (15.0, 8.0),
            GradedMetric::Fcf => (4.0, 2.0),
            GradedMetric::Debt => {
                return if value <= 2.0 {
                    Grade::Success
                } else if value <= 4.0 {
                    Grade::Warning
                } else {
                    Grade::Error
                };
            }
            GradedMetric::Return => (10.0, 0.0),
            GradedMetric::Esg => (85.0, 70.0),
            GradedMetric::Score => (75.0, 50.0),
        };

        if value >= good {
            Grade::Success
        } else if value >= fair {
            Grade::Warning
        } else {
            Grade::Error
        }
    }

    /// Sign of a change: up is success, down is error, flat is warning.
    pub fn of_change(value: f64) -> Self {
        if value > 0.0 {
            Grade::Success
        } else if value < 0.0 {
            Grade::Error
        } else {
            Grade::Warning
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_from_score() {
        assert_eq!(Recommendation::from_score(100), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_score(80), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_score(79), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(45), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(30), Recommendation::Reduce);
        assert_eq!(Recommendation::from_score(29), Recommendation::Avoid);
    }

    #[test]
    fn test_recommendation_wire_names() {
        assert_eq!(
            serde_json::to_string(&Recommendation::StrongBuy).unwrap(),
            "\"Strong Buy\""
        );
        assert_eq!(Recommendation::Reduce.to_string(), "Reduce");
    }

    #[test]
    fn test_grades() {
        assert_eq!(Grade::of(22.0, GradedMetric::Roce), Grade::Success);
        assert_eq!(Grade::of(12.0, GradedMetric::Roce), Grade::Warning);
        assert_eq!(Grade::of(3.0, GradedMetric::Fcf), Grade::Warning);
        assert_eq!(Grade::of(1.5, GradedMetric::Debt), Grade::Success);
        assert_eq!(Grade::of(4.5, GradedMetric::Debt), Grade::Error);
        assert_eq!(Grade::of(-1.0, GradedMetric::Return), Grade::Error);
        assert_eq!(Grade::of(75.0, GradedMetric::Score), Grade::Success);
    }

    #[test]
    fn test_change_grade() {
        assert_eq!(Grade::of_change(0.1), Grade::Success);
        assert_eq!(Grade::of_change(0.0), Grade::Warning);
        assert_eq!(Grade::of_change(-0.1), Grade::Error);
    }
}
