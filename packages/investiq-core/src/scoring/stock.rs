//! Composite scoring for listed stocks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Fundamentals;

/// Quality of reported earnings, judged from margins and cash generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EarningsQuality {
    High,
    Medium,
    Low,
}

impl fmt::Display for EarningsQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarningsQuality::High => write!(f, "High"),
            EarningsQuality::Medium => write!(f, "Medium"),
            EarningsQuality::Low => write!(f, "Low"),
        }
    }
}

/// High when the net margin exceeds 15% and FCF yield 2%, Medium when the
/// margin exceeds 8%, Low otherwise. Missing figures count as zero.
pub fn earnings_quality(profit_margin: Option<f64>, fcf_yield: Option<f64>) -> EarningsQuality {
    let margin = profit_margin.unwrap_or(0.0);
    let fcf = fcf_yield.unwrap_or(0.0);

    if margin > 0.15 && fcf > 2.0 {
        EarningsQuality::High
    } else if margin > 0.08 {
        EarningsQuality::Medium
    } else {
        EarningsQuality::Low
    }
}

/// Weighted 0-100 score from return on capital, earnings growth, cash yield,
/// leverage and six-month momentum. Missing metrics count as zero.
///
/// | Metric | Bands |
/// |---|---|
/// | ROCE | ≥25 +15, ≥20 +12, ≥15 +8, ≥10 +4, <5 -5 |
/// | EPS growth | ≥20 +15, ≥15 +12, ≥10 +8, ≥5 +4, <0 -5 |
/// | FCF yield | ≥5 +10, ≥3 +6, ≥1 +3 |
/// | Debt/EBITDA (else D/E) | ≤1 +10, ≤2 +6, ≤3 +3, >5 -5 |
/// | 6M return | ≥15 +10, ≥10 +7, ≥5 +4, <-10 -5 |
pub fn stock_composite_score(fundamentals: &Fundamentals, price_6m_return: Option<f64>) -> u8 {
    let mut score: f64 = 50.0;

    let roce = fundamentals.roce.unwrap_or(0.0);
    score += if roce >= 25.0 {
        15.0
    } else if roce >= 20.0 {
        12.0
    } else if roce >= 15.0 {
        8.0
    } else if roce >= 10.0 {
        4.0
    } else if roce < 5.0 {
        -5.0
    } else {
        0.0
    };

    let eps = fundamentals.eps_growth.unwrap_or(0.0);
    score += if eps >= 20.0 {
        15.0
    } else if eps >= 15.0 {
        12.0
    } else if eps >= 10.0 {
        8.0
    } else if eps >= 5.0 {
        4.0
    } else if eps < 0.0 {
        -5.0
    } else {
        0.0
    };

    let fcf = fundamentals.fcf_yield.unwrap_or(0.0);
    score += if fcf >= 5.0 {
        10.0
    } else if fcf >= 3.0 {
        6.0
    } else if fcf >= 1.0 {
        3.0
    } else {
        0.0
    };

    let debt = fundamentals
        .debt_to_ebitda
        .filter(|d| *d != 0.0)
        .or(fundamentals.debt_to_equity)
        .unwrap_or(0.0);
    score += if debt <= 1.0 {
        10.0
    } else if debt <= 2.0 {
        6.0
    } else if debt <= 3.0 {
        3.0
    } else if debt > 5.0 {
        -5.0
    } else {
        0.0
    };

    let momentum = price_6m_return.unwrap_or(0.0);
    score += if momentum >= 15.0 {
        10.0
    } else if momentum >= 10.0 {
        7.0
    } else if momentum >= 5.0 {
        4.0
    } else if momentum < -10.0 {
        -5.0
    } else {
        0.0
    };

    score.round().clamp(0.0, 100.0) as u8
}

/// Short human-readable reasons behind a stock's score.
pub fn stock_reasons(fundamentals: &Fundamentals, change_percent: f64) -> Vec<String> {
    let mut reasons = Vec::new();

    if fundamentals.roce.is_some_and(|r| r > 20.0) {
        reasons.push("High ROCE".to_string());
    }
    if fundamentals.eps_growth.is_some_and(|e| e > 15.0) {
        reasons.push("Strong EPS Growth".to_string());
    }
    if fundamentals.debt_to_equity.is_some_and(|d| d < 0.5) {
        reasons.push("Low Debt".to_string());
    }

    reasons.push(if change_percent > 0.0 {
        "Positive momentum".to_string()
    } else {
        "Market correction".to_string()
    });

    reasons
}
