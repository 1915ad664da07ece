//! Technical indicators over daily closing prices.
//!
//! Only the latest value of each indicator is needed for scoring, so both
//! functions return a single `Option<f64>` instead of a full series.

use std::fmt;

/// RSI lookback window.
pub const RSI_PERIOD: usize = 14;

/// Long-term moving average window.
pub const SMA_PERIOD: usize = 200;

/// Relative Strength Index with Wilder smoothing, latest value.
///
/// Needs at least `period + 1` closes; returns `None` otherwise. A window
/// with no losses saturates at 100.
#[must_use]
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = closes[i] - closes[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss -= delta;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    for i in (period + 1)..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let (gain, loss) = if delta > 0.0 {
            (delta, 0.0)
        } else {
            (0.0, -delta)
        };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Simple moving average over the trailing `period` closes, latest value.
#[must_use]
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Long-term price trend relative to the 200-day moving average.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    /// Price above the long-term average.
    Up,
    /// Price at or below the long-term average, or average unavailable.
    Down,
}

impl Trend {
    /// Classify the trend; an absent average counts as down.
    #[must_use]
    pub fn of(price: f64, long_sma: Option<f64>) -> Self {
        if long_sma.is_some_and(|s| price > s) {
            Self::Up
        } else {
            Self::Down
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "Up"),
            Self::Down => write!(f, "Down"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_averages_the_trailing_window() {
        let closes = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&closes, 3), Some(4.0));
        assert_eq!(sma(&closes, 5), Some(3.0));
        assert_eq!(sma(&closes, 6), None);
        assert_eq!(sma(&closes, 0), None);
    }

    #[test]
    fn rsi_needs_a_full_window() {
        let closes: Vec<f64> = (0..14).map(f64::from).collect();
        assert_eq!(rsi(&closes, 14), None);
        assert_eq!(rsi(&[], 14), None);
    }

    #[test]
    fn rsi_saturates_on_pure_gains() {
        let closes: Vec<f64> = (0..20).map(|i| 10.0 + f64::from(i)).collect();
        assert_eq!(rsi(&closes, 14), Some(100.0));
    }

    #[test]
    fn balanced_moves_sit_at_the_midpoint() {
        // alternating +1/-1 over exactly one window: equal gains and losses
        let closes: Vec<f64> = (0..15)
            .map(|i| if i % 2 == 0 { 10.0 } else { 11.0 })
            .collect();
        let value = rsi(&closes, 14).unwrap();
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_reacts_to_recent_losses() {
        // steady climb then a sharp drop keeps RSI well below saturation
        let mut closes: Vec<f64> = (0..30).map(|i| 10.0 + f64::from(i) * 0.1).collect();
        closes.push(9.0);
        let value = rsi(&closes, 14).unwrap();
        assert!(value < 70.0);
        assert!(value > 0.0);
    }

    #[test]
    fn trend_compares_price_to_average() {
        assert_eq!(Trend::of(11.0, Some(10.0)), Trend::Up);
        assert_eq!(Trend::of(10.0, Some(10.0)), Trend::Down);
        assert_eq!(Trend::of(9.0, Some(10.0)), Trend::Down);
        assert_eq!(Trend::of(9.0, None), Trend::Down);
    }
}
