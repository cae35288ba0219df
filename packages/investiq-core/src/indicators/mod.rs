//! Technical indicators for market analysis.
//!
//! Series functions take chronological (oldest-first) slices and return a
//! vector of the same length. `latest_*` helpers take latest-first slices, the
//! order quote histories are displayed in, and return only the newest value.
//!
//! - **SMA / EMA**: moving averages
//! - **RSI**: Relative Strength Index (Wilder)
//! - **MACD**: Moving Average Convergence Divergence
//! - **Bollinger Bands**, **z-score**
//! - **ADX / CMF**: trend strength and money flow over OHLCV bars

mod rsi;
mod sma;
mod trend;

pub use rsi::{latest_rsi, latest_rsi_chronological, rsi};
pub use sma::{ema, latest_ema, latest_sma, sma};
pub use trend::{adx, cmf, Candles, DEFAULT_ADX};

/// Bollinger Bands result.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    /// Middle band (SMA)
    pub middle: Vec<f64>,
    /// Upper band (middle + num_std * std)
    pub upper: Vec<f64>,
    /// Lower band (middle - num_std * std)
    pub lower: Vec<f64>,
}

/// Calculate Bollinger Bands.
///
/// Bands are 0.0 until the first full window (index `period - 1`).
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let n = data.len();
    let mut middle = vec![0.0; n];
    let mut upper = vec![0.0; n];
    let mut lower = vec![0.0; n];

    if period == 0 {
        return BollingerBands {
            middle,
            upper,
            lower,
        };
    }

    for i in period.saturating_sub(1)..n {
        let window = &data[i + 1 - period..=i];
        let mean: f64 = window.iter().sum::<f64>() / period as f64;
        let variance: f64 = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();

        middle[i] = mean;
        upper[i] = mean + num_std * std;
        lower[i] = mean - num_std * std;
    }

    BollingerBands {
        middle,
        upper,
        lower,
    }
}

/// MACD (Moving Average Convergence Divergence) result.
#[derive(Debug, Clone)]
pub struct Macd {
    /// MACD line (fast EMA - slow EMA)
    pub macd_line: Vec<f64>,
    /// Signal line (EMA of MACD line)
    pub signal_line: Vec<f64>,
    /// Histogram (MACD - Signal)
    pub histogram: Vec<f64>,
}

/// Calculate MACD indicator.
///
/// # Arguments
///
/// * `data` - Price series, oldest first
/// * `fast_period` - Fast EMA period (typically 12)
/// * `slow_period` - Slow EMA period (typically 26)
/// * `signal_period` - Signal line EMA period (typically 9)
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> Macd {
    let fast_ema = ema(data, fast_period);
    let slow_ema = ema(data, slow_period);

    let macd_line: Vec<f64> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(fast, slow)| fast - slow)
        .collect();
    let signal_line = ema(&macd_line, signal_period);
    let histogram = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    Macd {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Change of the MACD line over the last `lookback` points:
/// `line[n-1] - line[n-lookback]`. Zero when the line is too short.
pub fn macd_slope(line: &[f64], lookback: usize) -> f64 {
    let n = line.len();
    if lookback == 0 || n < lookback {
        return 0.0;
    }
    line[n - 1] - line[n - lookback]
}

/// Z-score of the newest value against the trailing `period` window
/// (sample standard deviation). Zero when the window is flat or short.
pub fn z_score(data: &[f64], period: usize) -> f64 {
    let n = data.len();
    if period < 2 || n < period {
        return 0.0;
    }

    let window = &data[n - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
    let std = variance.sqrt();

    if std > 0.0 {
        (data[n - 1] - mean) / std
    } else {
        0.0
    }
}

/// Percent distance of `price` from `reference`. Zero for a non-positive reference.
pub fn distance_from(price: f64, reference: f64) -> f64 {
    if reference > 0.0 {
        (price - reference) / reference * 100.0
    } else {
        0.0
    }
}

/// Percent change of the newest value over `lookback` points.
///
/// `None` when the series is shorter than `lookback + 1` or the base is zero.
pub fn period_return(data: &[f64], lookback: usize) -> Option<f64> {
    let n = data.len();
    if lookback == 0 || n <= lookback {
        return None;
    }

    let base = data[n - 1 - lookback];
    if base == 0.0 {
        return None;
    }
    Some((data[n - 1] - base) / base * 100.0)
}
