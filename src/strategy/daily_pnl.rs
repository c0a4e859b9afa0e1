use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::info;

/// Daily P/L in percent, measured against the first equity seen each UTC day
#[derive(Debug, Clone, Default)]
pub struct DailyPnlTracker {
    date: Option<NaiveDate>,
    day_open: Option<Decimal>,
}

impl DailyPnlTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an equity reading and return today's P/L percentage.
    ///
    /// None when the opening equity is not positive.
    pub fn observe(&mut self, equity: Decimal) -> Option<f64> {
        self.observe_at(Utc::now(), equity)
    }

    pub fn observe_at(&mut self, now: DateTime<Utc>, equity: Decimal) -> Option<f64> {
        let today = now.date_naive();
        if self.date != Some(today) {
            info!("Daily P/L reset for {}: opening equity {}", today, equity);
            self.date = Some(today);
            self.day_open = Some(equity);
        }

        let open = self.day_open.filter(|o| *o > Decimal::ZERO)?;
        ((equity - open) / open * Decimal::ONE_HUNDRED).to_f64()
    }

    pub fn day_open(&self) -> Option<Decimal> {
        self.day_open
    }
}
