//! Scoring for cryptocurrencies from their technical readings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::DEFAULT_ADX;

/// Price position relative to the 200-day EMA, confirmed by MACD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Trend {
    /// BULLISH above the EMA with a positive MACD, BEARISH below it with a
    /// negative MACD, NEUTRAL otherwise.
    pub fn classify(price: f64, ema_200: f64, macd: f64) -> Self {
        if price > ema_200 && macd > 0.0 {
            Trend::Bullish
        } else if price < ema_200 && macd < 0.0 {
            Trend::Bearish
        } else {
            Trend::Neutral
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
            Trend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Rating label for a coin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CryptoRating {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl fmt::Display for CryptoRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CryptoRating::StrongBuy => "STRONG BUY",
            CryptoRating::Buy => "BUY",
            CryptoRating::Hold => "HOLD",
            CryptoRating::Sell => "SELL",
            CryptoRating::StrongSell => "STRONG SELL",
        };
        write!(f, "{}", label)
    }
}

/// Technical readings a coin is scored on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CryptoSignals {
    pub rsi: f64,
    pub adx: f64,
    pub cmf: f64,
    pub distance_from_200_ema: f64,
    pub macd_slope: f64,
    pub trend: Trend,
    /// 24h price change, percent
    pub change_24h: f64,
}

impl Default for CryptoSignals {
    fn default() -> Self {
        Self {
            rsi: 50.0,
            adx: DEFAULT_ADX,
            cmf: 0.0,
            distance_from_200_ema: 0.0,
            macd_slope: 0.0,
            trend: Trend::Neutral,
            change_24h: 0.0,
        }
    }
}

fn clamp_score(score: i32) -> u8 {
    score.clamp(0, 100) as u8
}

/// Ranking score used by the snapshot pipeline.
pub fn crypto_score(signals: &CryptoSignals) -> u8 {
    let mut score = 50;

    let rsi = signals.rsi;
    score += if (40.0..=60.0).contains(&rsi) {
        15
    } else if (30.0..40.0).contains(&rsi) {
        10
    } else if rsi < 30.0 {
        5
    } else if rsi > 60.0 && rsi <= 70.0 {
        5
    } else {
        -5
    };

    score += match signals.trend {
        Trend::Bullish => 20,
        Trend::Bearish => -10,
        Trend::Neutral => 0,
    };

    if signals.adx > 50.0 {
        score += 10;
    } else if signals.adx > 25.0 {
        score += 5;
    }

    if signals.cmf > 0.1 {
        score += 10;
    } else if signals.cmf > 0.0 {
        score += 5;
    } else if signals.cmf < -0.1 {
        score -= 10;
    }

    let change = signals.change_24h;
    if change > -5.0 && change < 15.0 {
        score += 10;
    } else if change >= 15.0 {
        score += 5;
    }

    clamp_score(score)
}

/// STRONG BUY needs both a high score and a bullish trend.
pub fn crypto_recommendation(score: u8, trend: Trend) -> CryptoRating {
    if score >= 75 && trend == Trend::Bullish {
        CryptoRating::StrongBuy
    } else if score >= 60 {
        CryptoRating::Buy
    } else if score >= 40 {
        CryptoRating::Hold
    } else if score >= 25 {
        CryptoRating::Sell
    } else {
        CryptoRating::StrongSell
    }
}

/// Score shown in the institutional crypto table.
///
/// Rewards RSI between 30 and 70, strong ADX, price above the 200-day EMA,
/// positive money flow and a rising MACD.
pub fn institutional_crypto_score(signals: &CryptoSignals) -> u8 {
    let mut score = 50;

    let rsi = signals.rsi;
    if (30.0..=45.0).contains(&rsi) {
        score += 15;
    } else if (45.0..=55.0).contains(&rsi) {
        score += 10;
    } else if (55.0..=70.0).contains(&rsi) {
        score += 5;
    } else if rsi > 80.0 || rsi < 20.0 {
        score -= 10;
    }

    if signals.adx >= 50.0 {
        score += 15;
    } else if signals.adx >= 35.0 {
        score += 10;
    } else if signals.adx >= 25.0 {
        score += 5;
    }

    let distance = signals.distance_from_200_ema;
    if distance > 10.0 {
        score += 10;
    } else if distance > 0.0 {
        score += 5;
    } else if distance < -15.0 {
        score -= 10;
    }

    if signals.cmf > 0.15 {
        score += 10;
    } else if signals.cmf > 0.05 {
        score += 5;
    } else if signals.cmf < -0.15 {
        score -= 10;
    }

    if signals.macd_slope > 500.0 {
        score += 10;
    } else if signals.macd_slope > 100.0 {
        score += 5;
    } else if signals.macd_slope < -500.0 {
        score -= 10;
    }

    clamp_score(score)
}

/// One-line breakdown, e.g.
/// `RSI: Neutral (50.0) | ADX: Weak trend (25.0) | 200EMA: +0.0% | CMF: Neutral (0.000) | MACD: Bearish (0)`.
pub fn score_breakdown(signals: &CryptoSignals) -> String {
    let rsi_label = if signals.rsi < 30.0 {
        "Oversold"
    } else if signals.rsi > 70.0 {
        "Overbought"
    } else {
        "Neutral"
    };

    let adx_label = if signals.adx > 50.0 {
        "Strong trend"
    } else if signals.adx > 25.0 {
        "Moderate trend"
    } else {
        "Weak trend"
    };

    let cmf_label = if signals.cmf > 0.1 {
        "Strong buying"
    } else if signals.cmf > 0.0 {
        "Buying"
    } else if signals.cmf < -0.1 {
        "Strong selling"
    } else {
        "Neutral"
    };

    let distance = signals.distance_from_200_ema;
    let sign = if distance >= 0.0 { "+" } else { "" };
    let macd_label = if signals.macd_slope > 0.0 {
        "Bullish"
    } else {
        "Bearish"
    };

    [
        format!("RSI: {} ({:.1})", rsi_label, signals.rsi),
        format!("ADX: {} ({:.1})", adx_label, signals.adx),
        format!("200EMA: {}{:.1}%", sign, distance),
        format!("CMF: {} ({:.3})", cmf_label, signals.cmf),
        format!("MACD: {} ({:.0})", macd_label, signals.macd_slope),
    ]
    .join(" | ")
}

/// At most five reasons: the rating's headline pair, then indicator notes.
pub fn crypto_reasons(signals: &CryptoSignals, rating: CryptoRating) -> Vec<String> {
    let headline: [&str; 2] = match rating {
        CryptoRating::StrongBuy => ["Excellent technical setup", "Multiple bullish indicators"],
        CryptoRating::Buy => ["Positive technical indicators", "Good risk/reward"],
        CryptoRating::Hold => ["Neutral technical setup", "Wait for clearer signals"],
        CryptoRating::Sell => ["Mixed signals", "Caution advised"],
        CryptoRating::StrongSell => ["Weak technical setup", "High risk"],
    };
    let mut reasons: Vec<String> = headline.iter().map(|s| s.to_string()).collect();

    if signals.rsi < 30.0 {
        reasons.push(format!("Oversold (RSI: {:.1})", signals.rsi));
    } else if signals.rsi > 70.0 {
        reasons.push(format!("Overbought (RSI: {:.1})", signals.rsi));
    }

    match signals.trend {
        Trend::Bullish => reasons.push("Above 200 EMA with positive MACD".to_string()),
        Trend::Bearish => reasons.push("Below 200 EMA with negative MACD".to_string()),
        Trend::Neutral => {}
    }

    if signals.macd_slope > 0.0 {
        reasons.push("Rising MACD".to_string());
    }
    if signals.cmf > 0.1 {
        reasons.push("Strong buying pressure".to_string());
    } else if signals.cmf < -0.1 {
        reasons.push("Strong selling pressure".to_string());
    }

    reasons.truncate(5);
    reasons
}
