use tracing::{debug, warn};

use crate::config::ConditionConfig;
use crate::domain::{Bar, ConditionVerdict};

/// Volatility gate: too-flat and too-volatile markets are not traded
#[derive(Debug, Clone)]
pub struct ConditionFilter {
    config: ConditionConfig,
}

impl Default for ConditionFilter {
    fn default() -> Self {
        Self::new(ConditionConfig::default())
    }
}

impl ConditionFilter {
    pub fn new(config: ConditionConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, bars: &[Bar]) -> ConditionVerdict {
        let window = self.config.window.max(1);
        let recent = &bars[bars.len().saturating_sub(window)..];

        let Some(last) = recent.last() else {
            warn!("ConditionFilter: no bars");
            return ConditionVerdict::no_data();
        };
        if !(last.close.is_finite() && last.close > 0.0) || recent.iter().any(|b| !b.is_finite()) {
            warn!("ConditionFilter: unusable prices in window");
            return ConditionVerdict::no_data();
        }

        let ranges: Vec<f64> = recent.iter().map(Bar::range).collect();
        let avg_range = ranges.iter().sum::<f64>() / ranges.len() as f64;
        let std_range = sample_std(&ranges, avg_range);
        let volatility_ratio = avg_range / last.close;

        let (tradable, reason) = if volatility_ratio < self.config.min_volatility_ratio {
            (false, "too_flat")
        } else if volatility_ratio > self.config.max_volatility_ratio {
            (false, "too_volatile")
        } else {
            (true, "ok")
        };

        debug!(
            "ConditionFilter: tradable={}, reason={}, vol_ratio={:.5}",
            tradable, reason, volatility_ratio
        );

        ConditionVerdict {
            tradable,
            reason: reason.to_string(),
            volatility_ratio,
            avg_range,
            std_range,
        }
    }
}

fn sample_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
