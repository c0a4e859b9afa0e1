use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::RiskConfig;
use crate::domain::{AccountState, InstrumentSpec, RiskDecision};

/// What the governor needs to know about the proposed trade
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRequest {
    pub symbol: String,
    /// Stop-loss distance in price points
    pub sl_distance: Decimal,
    /// Today's P/L in percent of the day's opening equity, if known
    pub daily_pl_pct: Option<f64>,
}

/// Final admission gate: sizes the position or blocks the trade.
///
/// Checks run in a fixed order and the first failing one names the rejection.
/// The governor never retries and never touches the broker itself; account and
/// instrument data are fetched by the caller.
#[derive(Debug, Clone)]
pub struct RiskGovernor {
    config: RiskConfig,
}

impl RiskGovernor {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        request: &RiskRequest,
        account: Option<&AccountState>,
        instrument: Option<&InstrumentSpec>,
    ) -> RiskDecision {
        let Some(account) = account else {
            warn!("RiskGovernor: account state unavailable");
            return RiskDecision::reject("no_account");
        };

        if let Some(pl) = request.daily_pl_pct {
            if pl <= -self.config.max_daily_drawdown_pct {
                warn!(
                    "RiskGovernor: daily drawdown {:.2}% beyond limit {:.2}%",
                    pl, self.config.max_daily_drawdown_pct
                );
                return RiskDecision::reject("max_daily_drawdown_reached");
            }
        }

        if account.open_positions >= self.config.max_open_trades {
            warn!(
                "RiskGovernor: open trades {} >= max {}",
                account.open_positions, self.config.max_open_trades
            );
            return RiskDecision::reject("too_many_open_trades");
        }

        let lot = instrument
            .map(|spec| self.lot_from_risk(account.equity, request.sl_distance, spec))
            .unwrap_or(Decimal::ZERO);
        if lot <= Decimal::ZERO {
            warn!(
                "RiskGovernor: no valid lot for {} (sl={}, instrument={})",
                request.symbol,
                request.sl_distance,
                instrument.is_some()
            );
            return RiskDecision::reject("invalid_lot");
        }

        info!("RiskGovernor: approved {} lot={}", request.symbol, lot);
        RiskDecision::approve(lot)
    }

    /// `equity * risk% / (sl_distance * contract_size * point)`, clamped to the
    /// instrument's volume bounds. Zero when the inputs cannot produce a size.
    fn lot_from_risk(
        &self,
        equity: Decimal,
        sl_distance: Decimal,
        spec: &InstrumentSpec,
    ) -> Decimal {
        if sl_distance <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let tick_value = spec.tick_value();
        if tick_value <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let risk_amount = equity * self.config.risk_per_trade_pct / Decimal::ONE_HUNDRED;
        let Some(raw) = risk_amount.checked_div(sl_distance * tick_value) else {
            return Decimal::ZERO;
        };
        if raw <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let lot = raw.max(spec.volume_min).min(spec.volume_max);
        debug!(
            "RiskGovernor: risk={} tick_value={} raw_lot={} clamped={}",
            risk_amount, tick_value, raw, lot
        );
        lot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn governor() -> RiskGovernor {
        RiskGovernor::new(RiskConfig::default())
    }

    fn account(equity: Decimal, open_positions: u32) -> AccountState {
        AccountState {
            equity,
            open_positions,
        }
    }

    fn gold() -> InstrumentSpec {
        InstrumentSpec {
            symbol: "XAUUSD".to_string(),
            contract_size: dec!(100),
            point: dec!(0.01),
            volume_min: dec!(0.01),
            volume_max: dec!(100),
        }
    }

    fn request(sl: Decimal, daily_pl_pct: Option<f64>) -> RiskRequest {
        RiskRequest {
            symbol: "XAUUSD".to_string(),
            sl_distance: sl,
            daily_pl_pct,
        }
    }

    #[test]
    fn missing_account_is_rejected() {
        let d = governor().evaluate(&request(dec!(300), None), None, Some(&gold()));
        assert!(!d.allowed);
        assert_eq!(d.reason, "no_account");
        assert_eq!(d.lot_size, Decimal::ZERO);
    }

    #[test]
    fn drawdown_limit_is_inclusive() {
        let acct = account(dec!(10000), 0);
        let d = governor().evaluate(&request(dec!(300), Some(-3.0)), Some(&acct), Some(&gold()));
        assert_eq!(d.reason, "max_daily_drawdown_reached");

        let d = governor().evaluate(&request(dec!(300), Some(-2.99)), Some(&acct), Some(&gold()));
        assert!(d.allowed);
    }

    #[test]
    fn unknown_daily_pl_skips_drawdown_check() {
        let acct = account(dec!(10000), 0);
        let d = governor().evaluate(&request(dec!(300), None), Some(&acct), Some(&gold()));
        assert!(d.allowed);
    }

    #[test]
    fn rejects_at_max_open_trades() {
        let gov = governor();
        let d = gov.evaluate(
            &request(dec!(300), None),
            Some(&account(dec!(10000), 3)),
            Some(&gold()),
        );
        assert!(!d.allowed);
        assert_eq!(d.reason, "too_many_open_trades");
        assert_eq!(d.lot_size, Decimal::ZERO);

        let d = gov.evaluate(
            &request(dec!(300), None),
            Some(&account(dec!(10000), 2)),
            Some(&gold()),
        );
        assert!(d.allowed);
    }

    #[test]
    fn sizes_lot_from_equity_risk() {
        // risk 100 / (300 * 1.0) = 0.333...
        let d = governor().evaluate(
            &request(dec!(300), None),
            Some(&account(dec!(10000), 0)),
            Some(&gold()),
        );
        assert!(d.allowed);
        assert_eq!(d.reason, "ok");
        assert!(d.lot_size > dec!(0.333) && d.lot_size < dec!(0.334));
    }

    #[test]
    fn lot_is_clamped_to_volume_bounds() {
        let gov = governor();

        // risk 1 / 300 is far below the minimum volume
        let d = gov.evaluate(
            &request(dec!(300), None),
            Some(&account(dec!(100), 0)),
            Some(&gold()),
        );
        assert_eq!(d.lot_size, dec!(0.01));

        let mut capped = gold();
        capped.volume_max = dec!(0.5);
        let d = gov.evaluate(
            &request(dec!(1), None),
            Some(&account(dec!(1000000), 0)),
            Some(&capped),
        );
        assert_eq!(d.lot_size, dec!(0.5));
    }

    #[test]
    fn non_positive_stop_is_invalid() {
        let acct = account(dec!(10000), 0);
        for sl in [Decimal::ZERO, dec!(-10)] {
            let d = governor().evaluate(&request(sl, None), Some(&acct), Some(&gold()));
            assert_eq!(d.reason, "invalid_lot");
            assert_eq!(d.lot_size, Decimal::ZERO);
        }
    }

    #[test]
    fn missing_or_degenerate_instrument_is_invalid() {
        let acct = account(dec!(10000), 0);
        let d = governor().evaluate(&request(dec!(300), None), Some(&acct), None);
        assert_eq!(d.reason, "invalid_lot");

        let mut broken = gold();
        broken.point = Decimal::ZERO;
        let d = governor().evaluate(&request(dec!(300), None), Some(&acct), Some(&broken));
        assert_eq!(d.reason, "invalid_lot");
    }

    #[test]
    fn zero_equity_is_invalid() {
        let d = governor().evaluate(
            &request(dec!(300), None),
            Some(&account(Decimal::ZERO, 0)),
            Some(&gold()),
        );
        assert_eq!(d.reason, "invalid_lot");
    }
}
