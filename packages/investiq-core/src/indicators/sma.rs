//! Simple Moving Average (SMA) and Exponential Moving Average (EMA) indicators.

/// Calculate Simple Moving Average over a chronological series.
///
/// # Arguments
///
/// * `data` - Price series, oldest first
/// * `period` - Lookback period
///
/// # Returns
///
/// Vector of SMA values. First `period-1` values are 0.0.
///
/// # Example
///
/// ```rust
/// use investiq_core::indicators::sma;
///
/// let prices = vec![10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0];
/// let sma_values = sma(&prices, 3);
///
/// // SMA at index 2 = (10 + 11 + 12) / 3 = 11.0
/// assert!((sma_values[2] - 11.0).abs() < 0.001);
/// ```
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![0.0; n];

    if period == 0 || period > n {
        return result;
    }

    let mut sum: f64 = data[..period].iter().sum();
    result[period - 1] = sum / period as f64;

    for i in period..n {
        sum = sum - data[i - period] + data[i];
        result[i] = sum / period as f64;
    }

    result
}

/// Mean of the newest `period` prices of a latest-first series.
///
/// Returns `None` when fewer than `period` prices are available.
pub fn latest_sma(latest_first: &[f64], period: usize) -> Option<f64> {
    if period == 0 || latest_first.len() < period {
        return None;
    }
    Some(latest_first[..period].iter().sum::<f64>() / period as f64)
}

/// Calculate Exponential Moving Average over a chronological series.
///
/// Uses `EMA[i] = alpha * price[i] + (1 - alpha) * EMA[i-1]` with
/// `alpha = 2 / (period + 1)`, seeded with the first value.
///
/// # Example
///
/// ```rust
/// use investiq_core::indicators::ema;
///
/// let prices = vec![10.0, 11.0, 12.0, 11.0, 10.0, 11.0, 12.0, 13.0, 12.0, 11.0];
/// let ema_values = ema(&prices, 3);
///
/// assert_eq!(ema_values.len(), prices.len());
/// assert_eq!(ema_values[0], 10.0);
/// ```
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut result = vec![0.0; n];

    if period == 0 || n == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    result[0] = data[0];

    for i in 1..n {
        result[i] = alpha * data[i] + (1.0 - alpha) * result[i - 1];
    }

    result
}

/// Newest EMA value of a latest-first series.
///
/// Seeded with the SMA of the oldest `period` values, then smoothed forward
/// to the newest price.
pub fn latest_ema(latest_first: &[f64], period: usize) -> Option<f64> {
    if period == 0 || latest_first.len() < period {
        return None;
    }

    let chronological: Vec<f64> = latest_first.iter().rev().copied().collect();
    let k = 2.0 / (period as f64 + 1.0);
    let seed = chronological[..period].iter().sum::<f64>() / period as f64;

    Some(
        chronological[period..]
            .iter()
            .fold(seed, |prev, &price| price * k + prev * (1.0 - k)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result[0], 0.0);
        assert_eq!(result[1], 0.0);
        assert_relative_eq!(result[2], 2.0);
        assert_relative_eq!(result[3], 3.0);
        assert_relative_eq!(result[4], 4.0);
    }

    #[test]
    fn test_sma_period_too_long() {
        let result = sma(&[1.0, 2.0], 5);
        assert_eq!(result, vec![0.0, 0.0]);
    }

    #[test]
    fn test_latest_sma_uses_newest_prices() {
        // Newest first: 10, 20, then older 1000
        let prices = vec![10.0, 20.0, 1000.0];
        assert_eq!(latest_sma(&prices, 2), Some(15.0));
        assert_eq!(latest_sma(&prices, 4), None);
    }

    #[test]
    fn test_ema_constant() {
        let data = vec![5.0; 10];
        let result = ema(&data, 3);

        for value in result {
            assert_relative_eq!(value, 5.0);
        }
    }

    #[test]
    fn test_ema_tracks_trend() {
        let data: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let result = ema(&data, 5);

        // EMA lags a rising series
        assert!(result[19] < 19.0);
        assert!(result[19] > result[10]);
    }

    #[test]
    fn test_latest_ema_seeded_with_sma() {
        // Chronological 1, 2, 3, 4 written newest first
        let latest_first = vec![4.0, 3.0, 2.0, 1.0];
        // seed = (1 + 2 + 3) / 3 = 2, k = 0.5, next = 4 * 0.5 + 2 * 0.5 = 3
        assert_relative_eq!(latest_ema(&latest_first, 3).unwrap(), 3.0);
        assert_eq!(latest_ema(&latest_first, 5), None);
    }
}
