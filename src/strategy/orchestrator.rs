//! Signal fusion: technical direction, market gate and sentiment veto.

use rust_decimal::Decimal;
use tracing::info;

use crate::config::StrategyConfig;
use crate::domain::{
    Action, ConditionVerdict, ControlRecord, Decision, Direction, SentimentVerdict, TechnicalSignal,
};

/// Stateless decision function over one cycle's inputs.
///
/// The control record is passed in as a snapshot; the orchestrator never reads
/// or writes the control store itself.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    sl_distance: Decimal,
    tp_distance: Decimal,
    conflict_confidence: f64,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(&StrategyConfig::default())
    }
}

impl Orchestrator {
    pub fn new(config: &StrategyConfig) -> Self {
        Self {
            sl_distance: config.sl_distance,
            tp_distance: config.tp_distance,
            conflict_confidence: config.conflict_confidence,
        }
    }

    pub fn decide(
        &self,
        technical: &TechnicalSignal,
        sentiment: &SentimentVerdict,
        condition: &ConditionVerdict,
        control: &ControlRecord,
    ) -> Decision {
        if !control.trading_enabled {
            return Decision::hold("disabled_from_dashboard");
        }

        if !condition.tradable {
            return Decision::hold(format!("market_not_tradable:{}", condition.reason));
        }

        let profile = control.mode.profile();
        if technical.confidence < profile.confidence_threshold {
            return Decision::hold("low_technical_confidence");
        }

        if technical.direction == Direction::Neutral {
            return Decision::hold("technical_neutral");
        }

        // Sentiment may veto a trade but never initiates one.
        let leaning = sentiment.sentiment.leaning();
        if leaning != Direction::Neutral
            && leaning != technical.direction
            && sentiment.confidence >= self.conflict_confidence
        {
            return Decision::hold("conflict_tech_sentiment");
        }

        let decision = Decision {
            action: Action::from_direction(technical.direction),
            reason: format!("tech_{}_sent_{}", technical.direction, sentiment.sentiment),
            sl_distance: self.sl_distance,
            tp_distance: self.tp_distance,
            lot: profile.lot_size,
        };

        info!(
            "Orchestrator: {} mode={} conf={:.2} lot={} sl={} tp={}",
            decision.action,
            control.mode,
            technical.confidence,
            decision.lot,
            decision.sl_distance,
            decision.tp_distance
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Sentiment, TradingMode};
    use rust_decimal_macros::dec;

    fn technical(direction: Direction, confidence: f64) -> TechnicalSignal {
        TechnicalSignal {
            direction,
            confidence,
            buy_score: if direction == Direction::Buy { confidence * 4.0 } else { 0.0 },
            sell_score: if direction == Direction::Sell { confidence * 4.0 } else { 0.0 },
        }
    }

    fn sentiment(sentiment: Sentiment, confidence: f64) -> SentimentVerdict {
        SentimentVerdict {
            sentiment,
            confidence,
            reason: "test".to_string(),
            headlines: 3,
        }
    }

    fn tradable() -> ConditionVerdict {
        ConditionVerdict {
            tradable: true,
            reason: "ok".to_string(),
            volatility_ratio: 0.003,
            avg_range: 6.0,
            std_range: 1.0,
        }
    }

    fn control(mode: TradingMode) -> ControlRecord {
        ControlRecord {
            trading_enabled: true,
            mode,
        }
    }

    #[test]
    fn disabled_control_holds_first() {
        let mut condition = tradable();
        condition.tradable = false;
        let d = Orchestrator::default().decide(
            &technical(Direction::Buy, 1.0),
            &sentiment(Sentiment::Neutral, 0.4),
            &condition,
            &ControlRecord {
                trading_enabled: false,
                mode: TradingMode::Safe,
            },
        );
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.reason, "disabled_from_dashboard");
    }

    #[test]
    fn untradable_market_reports_condition_reason() {
        let mut condition = tradable();
        condition.tradable = false;
        condition.reason = "too_volatile".to_string();
        let d = Orchestrator::default().decide(
            &technical(Direction::Buy, 1.0),
            &sentiment(Sentiment::Neutral, 0.4),
            &condition,
            &control(TradingMode::Aggressive),
        );
        assert_eq!(d.reason, "market_not_tradable:too_volatile");
        assert_eq!(d.lot, Decimal::ZERO);
    }

    #[test]
    fn mode_thresholds_gate_confidence() {
        let orch = Orchestrator::default();
        let eps = 1e-6;
        for mode in TradingMode::ALL {
            let profile = mode.profile();

            let below = orch.decide(
                &technical(Direction::Buy, profile.confidence_threshold - eps),
                &sentiment(Sentiment::Neutral, 0.4),
                &tradable(),
                &control(mode),
            );
            assert_eq!(below.action, Action::Hold, "mode {mode}");
            assert_eq!(below.reason, "low_technical_confidence");

            let above = orch.decide(
                &technical(Direction::Sell, profile.confidence_threshold + eps),
                &sentiment(Sentiment::Neutral, 0.4),
                &tradable(),
                &control(mode),
            );
            assert_eq!(above.action, Action::Sell, "mode {mode}");
            assert_eq!(above.lot, profile.lot_size);
            assert_eq!(above.reason, "tech_sell_sent_neutral");

            let sell_below = orch.decide(
                &technical(Direction::Sell, profile.confidence_threshold - eps),
                &sentiment(Sentiment::Neutral, 0.4),
                &tradable(),
                &control(mode),
            );
            assert_eq!(sell_below.action, Action::Hold, "mode {mode}");
            assert_eq!(sell_below.reason, "low_technical_confidence");

            let buy_above = orch.decide(
                &technical(Direction::Buy, profile.confidence_threshold + eps),
                &sentiment(Sentiment::Neutral, 0.4),
                &tradable(),
                &control(mode),
            );
            assert_eq!(buy_above.action, Action::Buy, "mode {mode}");
            assert_eq!(buy_above.lot, profile.lot_size);
            assert_eq!(buy_above.reason, "tech_buy_sent_neutral");
        }
    }

    #[test]
    fn neutral_technical_holds() {
        let d = Orchestrator::default().decide(
            &technical(Direction::Neutral, 0.9),
            &sentiment(Sentiment::Bullish, 0.7),
            &tradable(),
            &control(TradingMode::Safe),
        );
        assert_eq!(d.reason, "technical_neutral");
    }

    #[test]
    fn strong_opposite_sentiment_vetoes() {
        let orch = Orchestrator::default();
        let d = orch.decide(
            &technical(Direction::Buy, 0.8),
            &sentiment(Sentiment::Bearish, 0.6),
            &tradable(),
            &control(TradingMode::Safe),
        );
        assert_eq!(d.action, Action::Hold);
        assert_eq!(d.reason, "conflict_tech_sentiment");

        let d = orch.decide(
            &technical(Direction::Buy, 0.8),
            &sentiment(Sentiment::Bearish, 0.3),
            &tradable(),
            &control(TradingMode::Safe),
        );
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.reason, "tech_buy_sent_bearish");
    }

    #[test]
    fn veto_threshold_is_inclusive() {
        let d = Orchestrator::default().decide(
            &technical(Direction::Sell, 0.8),
            &sentiment(Sentiment::Bullish, 0.5),
            &tradable(),
            &control(TradingMode::Balanced),
        );
        assert_eq!(d.reason, "conflict_tech_sentiment");
    }

    #[test]
    fn agreeing_sentiment_never_vetoes() {
        let d = Orchestrator::default().decide(
            &technical(Direction::Buy, 0.5),
            &sentiment(Sentiment::Bullish, 0.9),
            &tradable(),
            &control(TradingMode::Safe),
        );
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.reason, "tech_buy_sent_bullish");
    }

    #[test]
    fn full_buy_signal_in_safe_mode() {
        let signal = TechnicalSignal {
            direction: Direction::Buy,
            confidence: 1.0,
            buy_score: 4.0,
            sell_score: 0.0,
        };
        let d = Orchestrator::default().decide(
            &signal,
            &sentiment(Sentiment::Neutral, 0.4),
            &tradable(),
            &control(TradingMode::Safe),
        );
        assert_eq!(d.action, Action::Buy);
        assert_eq!(d.sl_distance, dec!(300));
        assert_eq!(d.tp_distance, dec!(600));
        assert_eq!(d.lot, dec!(0.01));
    }

    #[test]
    fn decide_is_deterministic() {
        let orch = Orchestrator::default();
        let inputs = (
            technical(Direction::Sell, 0.55),
            sentiment(Sentiment::Bullish, 0.45),
            tradable(),
            control(TradingMode::Balanced),
        );
        let first = orch.decide(&inputs.0, &inputs.1, &inputs.2, &inputs.3);
        for _ in 0..10 {
            assert_eq!(orch.decide(&inputs.0, &inputs.1, &inputs.2, &inputs.3), first);
        }
    }
}
