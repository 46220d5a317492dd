//! Technical indicator helpers.
//!
//! All helpers operate on the latest window of a plain close/volume slice
//! and tolerate series shorter than their lookback by returning a neutral
//! default instead of failing.

/// Simple moving average of the trailing `period` values, or of the whole
/// slice when it is shorter. `None` only for an empty slice or zero period.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() || period == 0 {
        return None;
    }
    let window = period.min(values.len());
    let sum: f64 = values[values.len() - window..].iter().sum();
    Some(sum / window as f64)
}

/// Relative-strength oscillator over the trailing `period` close-to-close
/// changes. Neutral 50 when there are fewer than `period + 1` closes or no
/// price movement at all; 100 when the window contains only gains.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in closes.len() - period..closes.len() {
        let change = closes[i] - closes[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        // A flat window reads neutral, not overbought.
        if avg_gain == 0.0 {
            return 50.0;
        }
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Average volume over the trailing `period` entries (whole slice if
/// shorter). Zero for an empty slice.
pub fn volume_average(volumes: &[f64], period: usize) -> f64 {
    if volumes.is_empty() || period == 0 {
        return 0.0;
    }
    let window = period.min(volumes.len());
    volumes[volumes.len() - window..].iter().sum::<f64>() / window as f64
}
