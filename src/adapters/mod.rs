pub mod control_store;
pub mod executor;
pub mod mt5_bridge;
pub mod news;

pub use crate::exchange::BrokerGateway;
pub use control_store::ControlStore;
pub use executor::OrderExecutor;
pub use mt5_bridge::Mt5Bridge;
pub use news::{Headline, NewsSource, RssNewsFeed};
