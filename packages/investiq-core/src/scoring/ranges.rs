//! Ideal value ranges and relative rating of metrics against them.

use serde::{Deserialize, Serialize};

use crate::types::AssetKind;

/// Healthy band for a metric. A target, when present, takes precedence in display.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct IdealRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    pub description: &'static str,
}

const fn band(min: f64, max: f64, description: &'static str) -> IdealRange {
    IdealRange {
        min: Some(min),
        max: Some(max),
        target: None,
        description,
    }
}

const fn aim(min: f64, target: f64, description: &'static str) -> IdealRange {
    IdealRange {
        min: Some(min),
        max: None,
        target: Some(target),
        description,
    }
}

const STOCK_RANGES: &[(&str, IdealRange)] = &[
    ("pe_ratio", band(10.0, 25.0, "P/E Ratio")),
    ("forward_pe", band(8.0, 20.0, "Forward P/E")),
    ("peg_ratio", band(0.5, 2.0, "PEG Ratio")),
    ("price_to_book", band(1.0, 5.0, "P/B Ratio")),
    ("roce", aim(15.0, 30.0, "ROCE (%)")),
    ("eps_growth", aim(10.0, 25.0, "EPS Growth (%)")),
    ("debt_to_equity", band(0.0, 1.0, "Debt/Equity")),
    ("fcf_yield", aim(3.0, 8.0, "FCF Yield (%)")),
    ("operating_margins", aim(15.0, 30.0, "Operating Margin (%)")),
    ("price_6m_return", aim(5.0, 15.0, "6M Return (%)")),
    ("debt_to_ebitda", band(0.0, 3.0, "Debt/EBITDA")),
    ("ev_to_ebitda", band(8.0, 15.0, "EV/EBITDA")),
    ("score", aim(60.0, 85.0, "Overall Score")),
    ("rsi", band(30.0, 70.0, "RSI")),
];

const CRYPTO_RANGES: &[(&str, IdealRange)] = &[
    (
        "rsi",
        band(30.0, 70.0, "RSI (Oversold < 30, Overbought > 70)"),
    ),
    ("score", aim(60.0, 85.0, "Overall Score")),
    ("price_change_24h", aim(0.0, 5.0, "24h Change (%)")),
    ("price_change_7d", aim(0.0, 10.0, "7d Change (%)")),
    ("price_change_1y", aim(0.0, 50.0, "1y Change (%)")),
];

/// Ideal range for a metric of the given asset kind.
pub fn ideal_range(metric: &str, kind: AssetKind) -> Option<IdealRange> {
    let table = match kind {
        AssetKind::Stock => STOCK_RANGES,
        AssetKind::Crypto => CRYPTO_RANGES,
    };
    table
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, range)| *range)
}

/// "Target: t", "Ideal: min-max", "Min: m" or "Max: m"; empty for unknown metrics.
pub fn format_ideal_range(metric: &str, kind: AssetKind) -> String {
    let Some(range) = ideal_range(metric, kind) else {
        return String::new();
    };

    match (range.min, range.max, range.target) {
        (_, _, Some(target)) => format!("Target: {}", target),
        (Some(min), Some(max), None) => format!("Ideal: {}-{}", min, max),
        (Some(min), None, None) => format!("Min: {}", min),
        (None, Some(max), None) => format!("Max: {}", max),
        (None, None, None) => String::new(),
    }
}

/// Whether `value` sits within the metric's min/max. Unknown metrics count as ideal.
pub fn is_in_ideal_range(value: f64, metric: &str, kind: AssetKind) -> bool {
    let Some(range) = ideal_range(metric, kind) else {
        return true;
    };

    if range.min.is_some_and(|min| value < min) {
        return false;
    }
    if range.max.is_some_and(|max| value > max) {
        return false;
    }
    true
}

/// Whether higher or lower values of a metric are better.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Higher is better
    #[default]
    Positive,
    /// Lower is better
    Negative,
    Neutral,
}

/// Five-step rating of a value relative to its ideal range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Poor,
    Weak,
    Fair,
    Good,
    Excellent,
}

impl Tier {
    /// Rate `value` against `range`.
    pub fn rate(value: f64, polarity: Polarity, range: Option<&IdealRange>) -> Self {
        Self::from_percentile(percentile(value, polarity, range))
    }

    /// ≥80 Excellent, ≥60 Good, ≥40 Fair, ≥20 Weak, else Poor.
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 80.0 {
            Tier::Excellent
        } else if percentile >= 60.0 {
            Tier::Good
        } else if percentile >= 40.0 {
            Tier::Fair
        } else if percentile >= 20.0 {
            Tier::Weak
        } else {
            Tier::Poor
        }
    }
}

/// Heuristic 0-100 standing of a value.
///
/// With a target, it is 100 minus the relative distance from the target in
/// percent. With a min/max band, values inside score 80, values below score
/// `value / min * 40` and values above `100 - (value - max) / max * 40`.
/// Without a range it is 50. Negative polarity inverts the result.
pub fn percentile(value: f64, polarity: Polarity, range: Option<&IdealRange>) -> f64 {
    let mut percentile = 50.0;

    if let Some(range) = range {
        match (range.target.filter(|t| *t != 0.0), range.min, range.max) {
            (Some(target), _, _) => {
                percentile = 100.0 - (value - target).abs() / target * 100.0;
            }
            (None, Some(min), Some(max)) => {
                percentile = if value < min {
                    value / min * 40.0
                } else if value > max {
                    100.0 - (value - max) / max * 40.0
                } else {
                    80.0
                };
            }
            _ => {}
        }
    }

    if polarity == Polarity::Negative {
        100.0 - percentile
    } else {
        percentile
    }
}

/// Signed percentage with two decimals: `+1.23%`, `-0.50%`.
pub fn format_percent(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lookup() {
        let pe = ideal_range("pe_ratio", AssetKind::Stock).unwrap();
        assert_eq!(pe.min, Some(10.0));
        assert_eq!(pe.max, Some(25.0));
        assert!(ideal_range("pe_ratio", AssetKind::Crypto).is_none());
    }

    #[test]
    fn test_format() {
        assert_eq!(format_ideal_range("roce", AssetKind::Stock), "Target: 30");
        assert_eq!(format_ideal_range("peg_ratio", AssetKind::Stock), "Ideal: 0.5-2");
        assert_eq!(format_ideal_range("nope", AssetKind::Stock), "");
    }

    #[test]
    fn test_is_in_ideal_range() {
        assert!(is_in_ideal_range(15.0, "pe_ratio", AssetKind::Stock));
        assert!(!is_in_ideal_range(40.0, "pe_ratio", AssetKind::Stock));
        assert!(!is_in_ideal_range(10.0, "roce", AssetKind::Stock));
        assert!(is_in_ideal_range(-99.0, "unknown", AssetKind::Crypto));
    }

    #[test]
    fn test_percentile_target() {
        let roce = ideal_range("roce", AssetKind::Stock);
        assert_relative_eq!(percentile(30.0, Polarity::Positive, roce.as_ref()), 100.0);
        assert_relative_eq!(percentile(15.0, Polarity::Positive, roce.as_ref()), 50.0);
    }

    #[test]
    fn test_percentile_band() {
        let pe = ideal_range("pe_ratio", AssetKind::Stock);
        assert_relative_eq!(percentile(5.0, Polarity::Positive, pe.as_ref()), 20.0);
        assert_relative_eq!(percentile(20.0, Polarity::Positive, pe.as_ref()), 80.0);
        assert_relative_eq!(percentile(50.0, Polarity::Positive, pe.as_ref()), 60.0);
        assert_relative_eq!(percentile(20.0, Polarity::Negative, pe.as_ref()), 20.0);
        assert_relative_eq!(percentile(1.0, Polarity::Positive, None), 50.0);
    }

    #[test]
    fn test_tier() {
        let rsi = ideal_range("rsi", AssetKind::Crypto);
        assert_eq!(Tier::rate(50.0, Polarity::Positive, rsi.as_ref()), Tier::Excellent);
        assert_eq!(Tier::from_percentile(65.0), Tier::Good);
        assert_eq!(Tier::from_percentile(45.0), Tier::Fair);
        assert_eq!(Tier::from_percentile(25.0), Tier::Weak);
        assert_eq!(Tier::from_percentile(-10.0), Tier::Poor);
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(1.234), "+1.23%");
        assert_eq!(format_percent(0.0), "+0.00%");
        assert_eq!(format_percent(-0.5), "-0.50%");
    }
}
