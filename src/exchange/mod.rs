mod traits;

pub use traits::BrokerGateway;
