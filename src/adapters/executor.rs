use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{Action, Decision, OrderReceipt, OrderTicket};
use crate::error::{ConfluenceError, Result};
use crate::exchange::BrokerGateway;

/// Turns an approved decision into a market order on the broker
pub struct OrderExecutor {
    broker: Arc<dyn BrokerGateway>,
    symbol: String,
    dry_run: bool,
}

impl OrderExecutor {
    pub fn new(broker: Arc<dyn BrokerGateway>, symbol: impl Into<String>, dry_run: bool) -> Self {
        Self {
            broker,
            symbol: symbol.into(),
            dry_run,
        }
    }

    /// Submit `decision` sized at `lot`. In dry-run mode the order is logged
    /// and reported as accepted without contacting the broker.
    pub async fn execute(&self, decision: &Decision, lot: Decimal) -> Result<OrderReceipt> {
        if decision.action == Action::Hold {
            return Err(ConfluenceError::Validation(
                "HOLD decisions are never executed".to_string(),
            ));
        }
        if lot <= Decimal::ZERO {
            return Err(ConfluenceError::Validation(format!("invalid lot {}", lot)));
        }

        let ticket = OrderTicket {
            symbol: self.symbol.clone(),
            side: decision.action,
            lot,
            sl_distance: decision.sl_distance,
            tp_distance: decision.tp_distance,
            comment: decision.reason.clone(),
        };

        info!(
            "Executing {} {}: lot={}, sl={}, tp={}, reason={}",
            ticket.side,
            ticket.symbol,
            ticket.lot,
            ticket.sl_distance,
            ticket.tp_distance,
            ticket.comment
        );

        if self.dry_run {
            info!("[DRY_RUN] Order not sent to broker");
            return Ok(OrderReceipt {
                ticket: 0,
                price: None,
                dry_run: true,
            });
        }

        self.broker.submit_order(&ticket).await.map_err(|e| {
            warn!("Order submission failed: {}", e);
            ConfluenceError::OrderSubmission(e.to_string())
        })
    }
}
