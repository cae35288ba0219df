//! Relative Strength Index (RSI) indicator.

/// RSI from average gain and average loss.
/// No losses gives 100, no gains gives 0, no change gives 50.
#[inline]
fn calculate_rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain <= 0.0 {
            50.0
        } else {
            100.0
        }
    } else if avg_gain <= 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

/// Calculate Relative Strength Index over a chronological series.
///
/// The first average gain and loss are simple means over `period` changes;
/// later values use Wilder's smoothing
/// `avg = (prev_avg * (period - 1) + current) / period`.
///
/// # Returns
///
/// Vector of RSI values (0-100 scale), 50 until the first full window.
///
/// # Example
///
/// ```rust
/// use investiq_core::indicators::rsi;
///
/// let prices = vec![44.0, 44.25, 44.5, 43.75, 44.5, 44.25, 44.5, 44.0, 43.5, 44.0,
///                   44.25, 44.0, 43.5, 44.0, 44.5, 44.25, 44.0];
/// let rsi_values = rsi(&prices, 14);
///
/// for &value in &rsi_values {
///     assert!(value >= 0.0 && value <= 100.0);
/// }
/// ```
pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    let mut result = vec![50.0; n];

    if period == 0 || n <= period {
        return result;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];

    for i in 1..n {
        let change = prices[i] - prices[i - 1];
        if change > 0.0 {
            gains[i] = change;
        } else {
            losses[i] = -change;
        }
    }

    let mut avg_gain: f64 = gains[1..=period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[1..=period].iter().sum::<f64>() / period as f64;
    result[period] = calculate_rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;

    for i in (period + 1)..n {
        avg_gain = alpha * gains[i] + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * losses[i] + (1.0 - alpha) * avg_loss;
        result[i] = calculate_rsi_value(avg_gain, avg_loss);
    }

    result
}

/// Newest RSI of a chronological series, `None` with fewer than `period + 1` prices.
pub fn latest_rsi_chronological(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }
    rsi(prices, period).last().copied()
}

/// Newest RSI of a latest-first series, `None` with fewer than `period + 1` prices.
pub fn latest_rsi(latest_first: &[f64], period: usize) -> Option<f64> {
    let chronological: Vec<f64> = latest_first.iter().rev().copied().collect();
    latest_rsi_chronological(&chronological, period)
}
