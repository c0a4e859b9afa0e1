use thiserror::Error;

/// Main error type for the decision loop
#[derive(Error, Debug)]
pub enum ConfluenceError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    // Market data errors
    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Broker errors
    #[error("Broker bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    // Collaborator errors
    #[error("Classifier error: {provider} - {reason}")]
    Classifier { provider: String, reason: String },

    #[error("News source error: {0}")]
    News(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for ConfluenceError
pub type Result<T> = std::result::Result<T, ConfluenceError>;

/// Protocol-level failures on the terminal bridge connection
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    #[error("Not connected to bridge at {addr}")]
    NotConnected { addr: String },

    #[error("Bridge closed the connection")]
    ConnectionClosed,

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Unexpected reply to {command}: {line}")]
    UnexpectedReply { command: String, line: String },

    #[error("Terminal error {code}: {message}")]
    Terminal { code: i64, message: String },

    #[error("Malformed field {field}: {value}")]
    MalformedField { field: &'static str, value: String },
}

impl ConfluenceError {
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        ConfluenceError::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    pub fn classifier(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfluenceError::Classifier {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}
