//! Small indicator helpers shared by the agents. All of these are plain
//! rolling-window arithmetic over close prices.

/// Return val if it is finite, otherwise return default.
#[inline]
pub fn finite_or(val: f64, default: f64) -> f64 {
    if val.is_finite() {
        val
    } else {
        default
    }
}

/// Simple moving average of the trailing `period` values, if available
pub fn sma_last(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }
    let sum: f64 = data[data.len() - period..].iter().sum();
    Some(finite_or(sum / period as f64, 0.0))
}

/// Bar-to-bar fractional returns
pub fn returns(data: &[f64]) -> Vec<f64> {
    data.windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| finite_or((w[1] - w[0]) / w[0], 0.0))
        .collect()
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    finite_or(data.iter().sum::<f64>() / data.len() as f64, 0.0)
}

/// Population standard deviation
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return 0.0;
    }
    let m = mean(data);
    let var = data.iter().map(|v| (v - m).powi(2)).sum::<f64>() / data.len() as f64;
    finite_or(var.sqrt(), 0.0)
}

/// Last value of a Wilder-smoothed RSI, defaulting to 50 when the series is
/// too short to seed the averages
pub fn rsi_last(data: &[f64], period: usize) -> f64 {
    if period == 0 || data.len() < period + 1 {
        return 50.0;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);
    for w in data.windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let mut avg_gain = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period as f64;
    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
    }

    let rs = if avg_loss == 0.0 {
        100.0
    } else {
        avg_gain / avg_loss
    };
    finite_or(100.0 - (100.0 / (1.0 + rs)), 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_last_averages_trailing_window() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma_last(&data, 3), Some(4.0));
        assert_eq!(sma_last(&data, 6), None);
    }

    #[test]
    fn std_dev_of_constant_series_is_zero() {
        let data = vec![2.0; 10];
        assert_eq!(std_dev(&data), 0.0);
    }

    #[test]
    fn rsi_of_monotonic_rise_saturates_high() {
        let data: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = rsi_last(&data, 14);
        assert!(rsi > 95.0, "rsi was {rsi}");
    }

    #[test]
    fn rsi_short_series_defaults_neutral() {
        assert_eq!(rsi_last(&[1.0, 2.0], 14), 50.0);
    }
}
