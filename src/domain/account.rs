use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Action;

/// Live account figures reported by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub equity: Decimal,
    /// Open positions on the traded symbol
    pub open_positions: u32,
}

/// Contract metadata needed for position sizing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub contract_size: Decimal,
    /// Price point size
    pub point: Decimal,
    pub volume_min: Decimal,
    pub volume_max: Decimal,
}

impl InstrumentSpec {
    /// Money per point per lot, approximated as contract size times point
    pub fn tick_value(&self) -> Decimal {
        self.contract_size * self.point
    }
}

/// Market order handed to the execution adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub symbol: String,
    pub side: Action,
    pub lot: Decimal,
    pub sl_distance: Decimal,
    pub tp_distance: Decimal,
    pub comment: String,
}

/// Broker acknowledgement of a submitted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub ticket: u64,
    pub price: Option<Decimal>,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tick_value_is_contract_times_point() {
        let spec = InstrumentSpec {
            symbol: "XAUUSD".to_string(),
            contract_size: dec!(100),
            point: dec!(0.01),
            volume_min: dec!(0.01),
            volume_max: dec!(50),
        };
        assert_eq!(spec.tick_value(), dec!(1));
    }
}
