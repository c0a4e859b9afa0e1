use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction voted by the indicator engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Buy,
    Sell,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
            Direction::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output of the indicator engine for the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub direction: Direction,
    /// Vote margin scaled to [0, 1]
    pub confidence: f64,
    pub buy_score: f64,
    pub sell_score: f64,
}

impl TechnicalSignal {
    /// Fallback used when the series cannot be analysed at all
    pub fn unusable() -> Self {
        Self {
            direction: Direction::Neutral,
            confidence: 0.1,
            buy_score: 0.0,
            sell_score: 0.0,
        }
    }
}

/// Market-condition gate result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionVerdict {
    pub tradable: bool,
    pub reason: String,
    /// Mean bar range over the window divided by the latest close
    pub volatility_ratio: f64,
    pub avg_range: f64,
    pub std_range: f64,
}

impl ConditionVerdict {
    pub fn no_data() -> Self {
        Self {
            tradable: false,
            reason: "no_data".to_string(),
            volatility_ratio: 0.0,
            avg_range: 0.0,
            std_range: 0.0,
        }
    }
}

/// News sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }

    /// The trade direction this sentiment leans towards, if any
    pub fn leaning(&self) -> Direction {
        match self {
            Sentiment::Bullish => Direction::Buy,
            Sentiment::Bearish => Direction::Sell,
            Sentiment::Neutral => Direction::Neutral,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sentiment classifier result.
///
/// `confidence` is a fixed heuristic score per outcome, not a calibrated probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub reason: String,
    /// Number of headlines that fed the classification
    #[serde(default)]
    pub headlines: usize,
}

impl SentimentVerdict {
    pub fn neutral(confidence: f64, reason: &str) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence,
            reason: reason.to_string(),
            headlines: 0,
        }
    }
}
