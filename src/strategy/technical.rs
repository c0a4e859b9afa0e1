//! Directional vote over the latest indicator snapshot.

use tracing::{debug, warn};

use super::indicators::IndicatorSnapshot;
use crate::domain::{Bar, Direction, TechnicalSignal};

/// Vote thresholds and the low-volatility damping rule
#[derive(Debug, Clone)]
pub struct TechnicalConfig {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    pub stoch_oversold: f64,
    pub stoch_overbought: f64,
    /// ATR below this fraction of its mean counts as a sideways regime
    pub atr_quiet_ratio: f64,
    /// Multiplier applied to both scores in a sideways regime
    pub quiet_damping: f64,
    /// Number of voting sources; the margin that saturates confidence
    pub max_votes: f64,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            stoch_oversold: 25.0,
            stoch_overbought: 75.0,
            atr_quiet_ratio: 0.7,
            quiet_damping: 0.8,
            max_votes: 4.0,
        }
    }
}

/// Indicator engine: bars in, TechnicalSignal out
#[derive(Debug, Clone, Default)]
pub struct TechnicalEngine {
    config: TechnicalConfig,
}

impl TechnicalEngine {
    pub fn new(config: TechnicalConfig) -> Self {
        Self { config }
    }

    /// Analyse the series. Never fails: unusable input yields a low-confidence neutral.
    pub fn analyze(&self, bars: &[Bar]) -> TechnicalSignal {
        if bars.is_empty() {
            warn!("TechnicalEngine: empty series");
            return TechnicalSignal::unusable();
        }
        if let Some(bad) = bars.iter().find(|b| !b.is_finite()) {
            warn!("TechnicalEngine: non-finite bar at {}", bad.time);
            return TechnicalSignal::unusable();
        }

        let snapshot = IndicatorSnapshot::compute(bars);
        self.score(&snapshot)
    }

    /// Turn a snapshot into buy/sell scores. Indicators still in lookback abstain.
    pub fn score(&self, snap: &IndicatorSnapshot) -> TechnicalSignal {
        let cfg = &self.config;
        let mut buy_score = 0.0;
        let mut sell_score = 0.0;

        // Trend
        if let (Some(fast), Some(slow)) = (snap.ema_fast, snap.ema_slow) {
            if fast > slow {
                buy_score += 1.0;
            } else {
                sell_score += 1.0;
            }
        }

        // Oscillator extremes
        if let Some(rsi) = snap.rsi {
            if rsi < cfg.rsi_oversold {
                buy_score += 1.0;
            } else if rsi > cfg.rsi_overbought {
                sell_score += 1.0;
            }
        }

        // Momentum
        if let (Some(line), Some(signal)) = (snap.macd, snap.macd_signal) {
            if line > signal {
                buy_score += 1.0;
            } else {
                sell_score += 1.0;
            }
        }

        // Range position
        if let Some(stoch) = snap.stochastic {
            if stoch < cfg.stoch_oversold {
                buy_score += 1.0;
            } else if stoch > cfg.stoch_overbought {
                sell_score += 1.0;
            }
        }

        if let (Some(atr), Some(mean)) = (snap.atr, snap.atr_mean) {
            if atr < mean * cfg.atr_quiet_ratio {
                debug!(
                    "ATR {:.5} below {:.0}% of mean {:.5}, damping scores",
                    atr,
                    cfg.atr_quiet_ratio * 100.0,
                    mean
                );
                buy_score *= cfg.quiet_damping;
                sell_score *= cfg.quiet_damping;
            }
        }

        let diff: f64 = buy_score - sell_score;
        let direction = if diff > 0.0 {
            Direction::Buy
        } else if diff < 0.0 {
            Direction::Sell
        } else {
            Direction::Neutral
        };
        let confidence = (diff.abs() / cfg.max_votes).min(1.0);

        debug!(
            "TechnicalEngine => buy_score={:.2}, sell_score={:.2}, dir={}, conf={:.2}",
            buy_score, sell_score, direction, confidence
        );

        TechnicalSignal {
            direction,
            confidence,
            buy_score,
            sell_score,
        }
    }
}
