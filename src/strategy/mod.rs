//! Strategy module
//!
//! Signal generation, fusion and gating for one instrument:
//! - `indicators` / `technical` - indicator math and the directional vote
//! - `condition` - volatility gate
//! - `orchestrator` - fuses technical, condition and sentiment into a decision
//! - `risk` / `daily_pnl` - position sizing and loss limits
//! - `engine` - the cycle driver tying collaborators together

pub mod condition;
pub mod daily_pnl;
pub mod engine;
pub mod indicators;
pub mod orchestrator;
pub mod risk;
pub mod technical;

#[cfg(test)]
pub(crate) mod test_support;

pub use condition::ConditionFilter;
pub use daily_pnl::DailyPnlTracker;
pub use engine::{CycleOutcome, CycleReport, DecisionEngine};
pub use indicators::IndicatorSnapshot;
pub use orchestrator::Orchestrator;
pub use risk::{RiskGovernor, RiskRequest};
pub use technical::{TechnicalConfig, TechnicalEngine};
