use analysis_core::{round_to, MacdSnapshot};

/// Simple Moving Average of the last `period` closes, rounded to 2 decimals.
///
/// `None` when the series is shorter than the window.
pub fn sma(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period {
        return None;
    }

    let window = &data[data.len() - period..];
    let sum: f64 = window.iter().sum();
    Some(round_to(sum / period as f64, 2))
}

/// Exponential Moving Average over the whole series, seeded at the first close.
///
/// Returns the final accumulator value.
pub fn ema(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 {
        return None;
    }
    let (first, rest) = data.split_first()?;

    let k = 2.0 / (period as f64 + 1.0);
    let mut acc = *first;
    for price in rest {
        acc = price * k + acc * (1.0 - k);
    }
    Some(acc)
}

/// Relative Strength Index using a simple average over the last `period` deltas.
///
/// Rounded to 2 decimals. `None` when fewer than `period + 1` closes exist.
pub fn rsi(data: &[f64], period: usize) -> Option<f64> {
    if period == 0 || data.len() < period + 1 {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;

    for pair in data[data.len() - period - 1..].windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses += change.abs();
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(round_to(100.0 - (100.0 / (1.0 + rs)), 2))
}

/// MACD (Moving Average Convergence Divergence)
///
/// The signal line is approximated as 10% of the MACD line instead of a
/// 9-period EMA of its history. Components are rounded to 3 decimals.
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize) -> Option<MacdSnapshot> {
    if fast_period == 0 || slow_period < fast_period || data.len() < slow_period {
        return None;
    }

    let line = ema(data, fast_period)? - ema(data, slow_period)?;
    let signal = line * 0.1;
    let histogram = line - signal;

    Some(MacdSnapshot {
        line: round_to(line, 3),
        signal: round_to(signal, 3),
        histogram: round_to(histogram, 3),
    })
}
