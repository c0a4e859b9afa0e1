use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;

/// Trade action emitted by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }

    pub fn from_direction(direction: Direction) -> Self {
        match direction {
            Direction::Buy => Action::Buy,
            Direction::Sell => Action::Sell,
            Direction::Neutral => Action::Hold,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The orchestrator's single output per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub reason: String,
    /// Stop-loss offset from entry, in price points
    pub sl_distance: Decimal,
    /// Take-profit offset from entry, in price points
    pub tp_distance: Decimal,
    /// Lot size of the active mode (zero on HOLD)
    pub lot: Decimal,
}

impl Decision {
    pub fn hold(reason: impl Into<String>) -> Self {
        Self {
            action: Action::Hold,
            reason: reason.into(),
            sl_distance: Decimal::ZERO,
            tp_distance: Decimal::ZERO,
            lot: Decimal::ZERO,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }
}

/// Final admission gate output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub allowed: bool,
    pub lot_size: Decimal,
    pub reason: String,
}

impl RiskDecision {
    pub fn approve(lot_size: Decimal) -> Self {
        Self {
            allowed: true,
            lot_size,
            reason: "ok".to_string(),
        }
    }

    /// Rejections always carry a zero lot
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            lot_size: Decimal::ZERO,
            reason: reason.into(),
        }
    }
}
