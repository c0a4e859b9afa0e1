use async_trait::async_trait;

use crate::domain::{AccountState, Bar, InstrumentSpec, OrderReceipt, OrderTicket};
use crate::error::Result;

/// Broker terminal and price feed for a single instrument.
///
/// Every method is a single request; callers bound them with their own
/// timeouts and never retry inside a cycle.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    /// Open the session, log in when credentials are configured and select the symbol
    async fn connect(&self) -> Result<()>;

    /// Latest `bars` closed bars, oldest first
    async fn get_history(&self, bars: usize) -> Result<Vec<Bar>>;

    /// Equity and the number of open positions on `symbol`
    async fn account_state(&self, symbol: &str) -> Result<AccountState>;

    async fn instrument(&self, symbol: &str) -> Result<InstrumentSpec>;

    async fn submit_order(&self, ticket: &OrderTicket) -> Result<OrderReceipt>;

    async fn shutdown(&self) -> Result<()>;
}

