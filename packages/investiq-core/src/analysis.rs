//! Technical summary of a quote's price history.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::indicators::{bollinger_bands, latest_ema, latest_rsi, latest_sma, macd, z_score};
use crate::{Error, Result};

/// Trade action suggested by a single indicator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Hold,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Hold => write!(f, "HOLD"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

/// Day-change signal: BUY above +2%, SELL below -2%.
pub fn quote_signal(change_percent: f64) -> Signal {
    if change_percent > 2.0 {
        Signal::Buy
    } else if change_percent < -2.0 {
        Signal::Sell
    } else {
        Signal::Hold
    }
}

/// RSI-driven signal and its 0-100 score.
///
/// Starts at 50; oversold (<30) adds 30, overbought (>70) subtracts 30,
/// the 30-45 band adds 10 and the 55-70 band subtracts 10.
pub fn rsi_signal(rsi: Option<f64>) -> (Signal, u8) {
    let mut score: i32 = 50;

    if let Some(rsi) = rsi {
        if rsi < 30.0 {
            score += 30;
        } else if rsi > 70.0 {
            score -= 30;
        } else if rsi < 45.0 {
            score += 10;
        } else if rsi > 55.0 {
            score -= 10;
        }
    }

    let signal = if score >= 70 {
        Signal::Buy
    } else if score <= 30 {
        Signal::Sell
    } else {
        Signal::Hold
    };

    (signal, score as u8)
}

/// Newest MACD reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MacdReading {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Newest Bollinger(20, 2) bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BollingerReading {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Indicator snapshot for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicalSummary {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_20: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<MacdReading>,
    pub bollinger: Option<BollingerReading>,
    /// Newest close against the trailing 20 closes
    pub z_score_20: Option<f64>,
    pub signal: Signal,
    pub score: u8,
}

impl TechnicalSummary {
    /// Minimum history for a MACD(12, 26, 9) reading.
    pub const MACD_MIN_POINTS: usize = 26;

    /// Window of the Bollinger bands and the z-score.
    pub const BAND_PERIOD: usize = 20;

    /// Fewest closes [`TechnicalSummary::analyze`] accepts.
    pub const MIN_POINTS: usize = 2;

    /// Like [`TechnicalSummary::from_latest_first`], but fails when there are
    /// fewer than [`Self::MIN_POINTS`] closes.
    pub fn analyze(prices: &[f64]) -> Result<Self> {
        if prices.len() < Self::MIN_POINTS {
            return Err(Error::InsufficientData(format!(
                "need at least {} closes, got {}",
                Self::MIN_POINTS,
                prices.len()
            )));
        }
        Ok(Self::from_latest_first(prices))
    }

    /// Summarize a latest-first price history.
    pub fn from_latest_first(prices: &[f64]) -> Self {
        let rsi_14 = latest_rsi(prices, 14);
        let (signal, score) = rsi_signal(rsi_14);

        let chronological: Vec<f64> = prices.iter().rev().copied().collect();
        let last = chronological.len().saturating_sub(1);

        let macd = (prices.len() >= Self::MACD_MIN_POINTS).then(|| {
            let result = macd(&chronological, 12, 26, 9);
            MacdReading {
                macd: result.macd_line[last],
                signal: result.signal_line[last],
                histogram: result.histogram[last],
            }
        });

        let banded = prices.len() >= Self::BAND_PERIOD;
        let bollinger = banded.then(|| {
            let bands = bollinger_bands(&chronological, Self::BAND_PERIOD, 2.0);
            BollingerReading {
                upper: bands.upper[last],
                middle: bands.middle[last],
                lower: bands.lower[last],
            }
        });
        let z_score_20 = banded.then(|| z_score(&chronological, Self::BAND_PERIOD));

        Self {
            sma_20: latest_sma(prices, 20),
            sma_50: latest_sma(prices, 50),
            ema_20: latest_ema(prices, 20),
            rsi_14,
            macd,
            bollinger,
            z_score_20,
            signal,
            score,
        }
    }
}
