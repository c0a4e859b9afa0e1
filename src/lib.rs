pub mod adapters;
pub mod agent;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod services;
pub mod strategy;

pub use adapters::{ControlStore, Mt5Bridge, OrderExecutor, RssNewsFeed};
pub use agent::{build_classifier_chain, ClassifierChain, SentimentClassifier, TextClassifier};
pub use config::AppConfig;
pub use coordination::{GracefulShutdown, ShutdownSignal, ShutdownToken};
pub use error::{ConfluenceError, Result};
pub use exchange::BrokerGateway;
pub use strategy::{CycleOutcome, CycleReport, DecisionEngine};
