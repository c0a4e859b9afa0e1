//! Bar fixtures shared by the strategy unit tests.

use chrono::{Duration, TimeZone, Utc};

use crate::domain::Bar;

/// Bars with open = close and a symmetric high/low band, 15 minutes apart.
pub fn bars_from_closes(closes: &[f64], half_range: f64) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            time: start + Duration::minutes(15 * i as i64),
            open: close,
            high: close + half_range,
            low: close - half_range,
            close,
            volume: 1.0,
        })
        .collect()
}

pub fn flat_bars(n: usize, price: f64) -> Vec<Bar> {
    bars_from_closes(&vec![price; n], 0.0)
}

/// Long rally, a sharp dip, then a slow drift lower.
///
/// The latest bar sits low in its range with fresh losses, while both EMA
/// pairs still point up: every voting indicator reads BUY.
pub fn rally_then_pullback() -> Vec<Bar> {
    let mut closes = Vec::with_capacity(300);
    let mut p = 100.0;
    for _ in 0..270 {
        p += 0.5;
        closes.push(p);
    }
    for _ in 0..10 {
        p -= 1.0;
        closes.push(p);
    }
    for _ in 0..20 {
        p -= 0.08;
        closes.push(p);
    }
    bars_from_closes(&closes, 0.3)
}
