use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfluenceError, Result};

/// One OHLC candle for a fixed time interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// High minus low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// True when every price field is a finite number
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }

    /// True range against the previous close (plain range for the first bar)
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.range(),
        }
    }
}

/// Check that a series is chronological with no duplicate timestamps.
pub fn validate_series(bars: &[Bar]) -> Result<()> {
    for pair in bars.windows(2) {
        if pair[1].time <= pair[0].time {
            return Err(ConfluenceError::InvalidMarketData(format!(
                "bars out of order or duplicated at {}",
                pair[1].time
            )));
        }
    }
    Ok(())
}

/// Close column used by the indicator engine
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}
