use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named risk/aggressiveness profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TradingMode {
    #[default]
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "BALANCED")]
    Balanced,
    #[serde(rename = "AGGRESSIVE")]
    Aggressive,
    #[serde(rename = "SCALPING_M5")]
    ScalpingM5,
}

/// Confidence threshold and lot size selected by a mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeProfile {
    pub confidence_threshold: f64,
    pub lot_size: Decimal,
}

impl TradingMode {
    pub const ALL: [TradingMode; 4] = [
        TradingMode::Safe,
        TradingMode::Balanced,
        TradingMode::Aggressive,
        TradingMode::ScalpingM5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TradingMode::Safe => "SAFE",
            TradingMode::Balanced => "BALANCED",
            TradingMode::Aggressive => "AGGRESSIVE",
            TradingMode::ScalpingM5 => "SCALPING_M5",
        }
    }

    pub fn profile(&self) -> ModeProfile {
        let (confidence_threshold, lot_size) = match self {
            TradingMode::Safe => (0.40, dec!(0.01)),
            TradingMode::Balanced => (0.30, dec!(0.02)),
            TradingMode::Aggressive => (0.20, dec!(0.04)),
            TradingMode::ScalpingM5 => (0.15, dec!(0.03)),
        };
        ModeProfile {
            confidence_threshold,
            lot_size,
        }
    }
}

impl fmt::Display for TradingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradingMode {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Ok(TradingMode::Safe),
            "BALANCED" => Ok(TradingMode::Balanced),
            "AGGRESSIVE" => Ok(TradingMode::Aggressive),
            "SCALPING_M5" | "SCALPING-M5" => Ok(TradingMode::ScalpingM5),
            other => Err(format!(
                "unknown mode '{other}'; expected SAFE|BALANCED|AGGRESSIVE|SCALPING_M5"
            )),
        }
    }
}

// Unknown mode strings written by an operator fall back to SAFE instead of failing the read.
impl<'de> Deserialize<'de> for TradingMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

fn default_trading_enabled() -> bool {
    true
}

/// Operator-owned runtime switch: enable flag plus active mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRecord {
    #[serde(default = "default_trading_enabled")]
    pub trading_enabled: bool,
    #[serde(default)]
    pub mode: TradingMode,
}

impl Default for ControlRecord {
    fn default() -> Self {
        Self {
            trading_enabled: true,
            mode: TradingMode::Safe,
        }
    }
}
