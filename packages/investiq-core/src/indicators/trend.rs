//! Trend-strength and money-flow indicators over OHLCV bars.

/// ADX reported when there is not enough data to compute one.
pub const DEFAULT_ADX: f64 = 25.0;

/// OHLCV bars, oldest first. All vectors share one length.
#[derive(Debug, Clone, PartialEq)]
pub struct Candles {
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Candles {
    /// Synthesize bars from a close-only series.
    ///
    /// High and low are `close * (1 ± σ)` where σ is the sample standard
    /// deviation of simple returns (±2% when σ is zero). Volume falls back to
    /// `close * 1e6` when none is given or the lengths differ.
    pub fn synthesize(closes: &[f64], volumes: Option<&[f64]>) -> Self {
        let sigma = returns_std(closes);
        let band = if sigma > 0.0 && sigma.is_finite() {
            sigma.abs()
        } else {
            0.02
        };

        let volume = match volumes {
            Some(v) if v.len() == closes.len() => v.to_vec(),
            _ => closes.iter().map(|c| c * 1_000_000.0).collect(),
        };

        Self {
            high: closes.iter().map(|c| c * (1.0 + band)).collect(),
            low: closes.iter().map(|c| c * (1.0 - band)).collect(),
            close: closes.to_vec(),
            volume,
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

fn returns_std(closes: &[f64]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    variance.sqrt()
}

fn window_mean(values: &[f64], end: usize, period: usize) -> f64 {
    values[end + 1 - period..=end].iter().sum::<f64>() / period as f64
}

/// Average Directional Index of the newest bar.
///
/// True range and directional movement are averaged over `period` bars, DX
/// is derived from the directional indicators and the ADX is the mean of the
/// last `period` DX values. Returns [`DEFAULT_ADX`] with fewer than
/// `2 * period + 1` bars.
pub fn adx(candles: &Candles, period: usize) -> f64 {
    let n = candles.len();
    if period == 0 || n < 2 * period + 1 {
        return DEFAULT_ADX;
    }

    let (high, low, close) = (&candles.high, &candles.low, &candles.close);
    let mut tr = vec![0.0; n];
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];

    for i in 1..n {
        tr[i] = (high[i] - low[i])
            .max((high[i] - close[i - 1]).abs())
            .max((low[i] - close[i - 1]).abs());

        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        if up > down && up > 0.0 {
            plus_dm[i] = up;
        }
        if down > up && down > 0.0 {
            minus_dm[i] = down;
        }
    }

    let mut dx = Vec::with_capacity(n);
    for i in period..n {
        let atr = window_mean(&tr, i, period);
        if atr <= 0.0 {
            dx.push(0.0);
            continue;
        }
        let plus_di = 100.0 * window_mean(&plus_dm, i, period) / atr;
        let minus_di = 100.0 * window_mean(&minus_dm, i, period) / atr;
        let sum = plus_di + minus_di;
        dx.push(if sum > 0.0 {
            100.0 * (plus_di - minus_di).abs() / sum
        } else {
            0.0
        });
    }

    let value = dx[dx.len() - period..].iter().sum::<f64>() / period as f64;
    if value.is_finite() {
        value
    } else {
        DEFAULT_ADX
    }
}

/// Chaikin Money Flow over the newest `period` bars.
///
/// Returns 0 with fewer than `period` bars or zero volume.
pub fn cmf(candles: &Candles, period: usize) -> f64 {
    let n = candles.len();
    if period == 0 || n < period {
        return 0.0;
    }

    let mut flow = 0.0;
    let mut volume = 0.0;

    for i in n - period..n {
        let range = candles.high[i] - candles.low[i];
        let multiplier = if range > 0.0 {
            ((candles.close[i] - candles.low[i]) - (candles.high[i] - candles.close[i])) / range
        } else {
            0.0
        };
        flow += multiplier * candles.volume[i];
        volume += candles.volume[i];
    }

    if volume > 0.0 {
        flow / volume
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_synthesize_flat_series() {
        let candles = Candles::synthesize(&[100.0; 5], None);

        assert_relative_eq!(candles.high[0], 102.0);
        assert_relative_eq!(candles.low[0], 98.0);
        assert_relative_eq!(candles.volume[0], 100_000_000.0);
    }

    #[test]
    fn test_synthesize_keeps_matching_volumes() {
        let closes = [1.0, 2.0, 3.0];
        let candles = Candles::synthesize(&closes, Some(&[10.0, 20.0, 30.0]));
        assert_eq!(candles.volume, vec![10.0, 20.0, 30.0]);

        let candles = Candles::synthesize(&closes, Some(&[10.0]));
        assert_eq!(candles.volume, vec![1e6, 2e6, 3e6]);
    }

    #[test]
    fn test_adx_insufficient_data() {
        let candles = Candles::synthesize(&[1.0; 10], None);
        assert_eq!(adx(&candles, 14), DEFAULT_ADX);
    }

    #[test]
    fn test_adx_strong_trend() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 2.0).collect();
        let candles = Candles {
            high: closes.iter().map(|c| c + 1.0).collect(),
            low: closes.iter().map(|c| c - 1.0).collect(),
            volume: vec![1000.0; closes.len()],
            close: closes,
        };

        // Steady one-directional moves leave only +DM, so DX is 100
        assert_relative_eq!(adx(&candles, 14), 100.0);
    }

    #[test]
    fn test_cmf_closes_at_high() {
        let candles = Candles {
            high: vec![11.0; 25],
            low: vec![9.0; 25],
            close: vec![11.0; 25],
            volume: vec![500.0; 25],
        };
        assert_relative_eq!(cmf(&candles, 20), 1.0);
    }

    #[test]
    fn test_cmf_symmetric_bars_are_neutral() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + i as f64).collect();
        let candles = Candles::synthesize(&closes, None);
        assert!(cmf(&candles, 20).abs() < 1e-9);
    }

    #[test]
    fn test_cmf_insufficient_data() {
        let candles = Candles::synthesize(&[1.0, 2.0], None);
        assert_eq!(cmf(&candles, 20), 0.0);
    }
}
