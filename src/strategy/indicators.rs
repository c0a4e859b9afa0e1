//! Technical indicators over an OHLC series.
//!
//! Every function returns a vector aligned with its input. Positions before an
//! indicator's lookback is satisfied hold `f64::NAN`; callers treat NaN as
//! "not enough data" and abstain.

use crate::domain::{self, Bar};

pub const EMA_FAST: usize = 20;
pub const EMA_SLOW: usize = 50;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const RSI_PERIOD: usize = 14;
pub const STOCH_PERIOD: usize = 14;
pub const ATR_PERIOD: usize = 14;

/// Exponential moving average, alpha = 2 / (span + 1).
///
/// Leading NaNs are skipped so the function can be chained (MACD signal line).
/// Seed is the SMA of the first `span` finite values; a NaN after the seed
/// taints the rest of the series.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if span == 0 {
        return result;
    }

    let start = values.iter().position(|v| v.is_finite()).unwrap_or(n);
    if n - start < span {
        return result;
    }

    let seed_window = &values[start..start + span];
    if seed_window.iter().any(|v| !v.is_finite()) {
        return result;
    }
    let seed = seed_window.iter().sum::<f64>() / span as f64;
    result[start + span - 1] = seed;

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev = seed;
    for i in (start + span)..n {
        if !values[i].is_finite() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }

    result
}

/// Simple rolling mean; NaN wherever the window holds a non-finite value.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().all(|v| v.is_finite()) {
            result[i] = slice.iter().sum::<f64>() / window as f64;
        }
    }
    result
}

/// Momentum oscillator on a 0..100 scale.
///
/// Uses the plain `period` mean of positive deltas over the mean of absolute
/// negative deltas. A window without losses has an undefined ratio and reads 50.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return result;
    }

    let deltas: Vec<f64> = std::iter::once(f64::NAN)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .collect();

    for i in period..n {
        let window = &deltas[i + 1 - period..=i];
        if window.iter().any(|d| !d.is_finite()) {
            continue;
        }
        let avg_gain = window.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
        let avg_loss = -window.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;
        result[i] = rsi_value(avg_gain, avg_loss);
    }
    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        50.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// MACD line and its signal line
pub fn macd(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, MACD_SIGNAL);
    (line, signal)
}

/// Position of the close inside the `period` high/low range, 0..100.
/// A zero-width range reads 50.
pub fn stochastic(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &bars[i + 1 - period..=i];
        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let range = high - low;
        result[i] = if !range.is_finite() {
            f64::NAN
        } else if range == 0.0 {
            50.0
        } else {
            (bars[i].close - low) / range * 100.0
        };
    }
    result
}

/// True range series; the first bar has no previous close and is NaN.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut result = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        if i == 0 {
            result.push(f64::NAN);
        } else {
            result.push(bar.true_range(Some(bars[i - 1].close)));
        }
    }
    result
}

/// Average true range as the rolling mean of the true range
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    rolling_mean(&true_range(bars), period)
}

/// Mean of the finite entries, None when there are none
pub fn finite_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn last_finite(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}

/// Indicator readings for the latest bar.
///
/// `None` marks an indicator whose lookback is not yet satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSnapshot {
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub stochastic: Option<f64>,
    pub atr: Option<f64>,
    /// Mean of the ATR series over the whole history
    pub atr_mean: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn compute(bars: &[Bar]) -> Self {
        let closes = domain::closes(bars);
        let (macd_line, macd_signal) = macd(&closes);
        let atr_series = atr(bars, ATR_PERIOD);

        Self {
            ema_fast: last_finite(&ema(&closes, EMA_FAST)),
            ema_slow: last_finite(&ema(&closes, EMA_SLOW)),
            rsi: last_finite(&rsi(&closes, RSI_PERIOD)),
            macd: last_finite(&macd_line),
            macd_signal: last_finite(&macd_signal),
            stochastic: last_finite(&stochastic(bars, STOCH_PERIOD)),
            atr: last_finite(&atr_series),
            atr_mean: finite_mean(&atr_series),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{bars_from_closes, flat_bars};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn ema_seeds_with_sma() {
        // alpha = 0.5, seed SMA(10, 11, 12) = 11
        let result = ema(&[10.0, 11.0, 12.0, 13.0, 14.0], 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0);
        assert_approx(result[3], 12.0);
        assert_approx(result[4], 13.0);
    }

    #[test]
    fn ema_skips_leading_nan() {
        let result = ema(&[f64::NAN, f64::NAN, 10.0, 11.0, 12.0, 13.0], 3);
        assert!(result[3].is_nan());
        assert_approx(result[4], 11.0);
        assert_approx(result[5], 12.0);
    }

    #[test]
    fn ema_short_input_is_all_nan() {
        assert!(ema(&[1.0, 2.0], 3).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_without_losses_is_neutral() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&closes, 14);
        assert!(result[13].is_nan());
        assert_approx(result[14], 50.0);
        assert_approx(result[19], 50.0);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&closes, 14);
        assert_approx(result[19], 0.0);
    }

    #[test]
    fn rsi_mixed_window() {
        // deltas: +2, -1, +2, -1 ; gains 4/4 = 1, losses 2/4 = 0.5 → 100 - 100/3
        let closes = [10.0, 12.0, 11.0, 13.0, 12.0];
        let result = rsi(&closes, 4);
        assert_approx(result[4], 100.0 - 100.0 / 3.0);
    }

    #[test]
    fn stochastic_flat_window_reads_fifty() {
        let bars = flat_bars(14, 1800.0);
        let result = stochastic(&bars, 14);
        assert_approx(result[13], 50.0);
    }

    #[test]
    fn stochastic_close_at_extremes() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.0);
        let result = stochastic(&bars, 5);
        assert_approx(result[4], 100.0);

        let bars = bars_from_closes(&[5.0, 4.0, 3.0, 2.0, 1.0], 0.0);
        let result = stochastic(&bars, 5);
        assert_approx(result[4], 0.0);
    }

    #[test]
    fn atr_waits_for_previous_close() {
        let bars = bars_from_closes(&[10.0, 10.0, 10.0, 10.0], 1.0);
        let result = atr(&bars, 3);
        assert!(result[2].is_nan());
        assert_approx(result[3], 2.0);
    }

    #[test]
    fn macd_signal_starts_after_both_lookbacks() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let (line, signal) = macd(&closes);
        assert!(line[24].is_nan());
        assert!(line[25].is_finite());
        assert!(signal[32].is_nan());
        assert!(signal[33].is_finite());
    }

    #[test]
    fn snapshot_abstains_on_short_history() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let snap = IndicatorSnapshot::compute(&bars_from_closes(&closes, 0.5));
        assert!(snap.ema_fast.is_some());
        assert!(snap.ema_slow.is_none());
        assert!(snap.macd.is_some());
        assert!(snap.macd_signal.is_none());
        assert!(snap.rsi.is_some());
        assert!(snap.atr.is_some());
    }

    #[test]
    fn finite_mean_ignores_nan() {
        assert_eq!(finite_mean(&[f64::NAN, 1.0, 3.0]), Some(2.0));
        assert_eq!(finite_mean(&[f64::NAN]), None);
    }
}
