use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub condition: ConditionConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Instrument to trade (e.g., "XAUUSD")
    pub symbol: String,
    /// Bar interval in minutes
    #[serde(default = "default_timeframe")]
    pub timeframe_minutes: u32,
    /// Log orders instead of sending them
    #[serde(default = "default_true")]
    pub dry_run: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "XAUUSD".to_string(),
            timeframe_minutes: default_timeframe(),
            dry_run: true,
        }
    }
}

fn default_timeframe() -> u32 {
    15
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Equity percentage risked per trade (1.0 = 1%)
    pub risk_per_trade_pct: Decimal,
    /// Daily loss in percent of equity that halts new entries
    pub max_daily_drawdown_pct: f64,
    /// Maximum concurrent positions on the symbol
    pub max_open_trades: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: dec!(1.0),
            max_daily_drawdown_pct: 3.0,
            max_open_trades: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum bars before a cycle may reach the orchestrator
    pub min_bars_required: usize,
    /// Bars requested from the feed each cycle
    pub history_bars: usize,
    /// Sleep between cycles
    pub loop_sleep_seconds: u64,
    /// Upper bound for any single collaborator call
    pub collaborator_timeout_secs: u64,
    /// Upper bound for the whole sentiment pass (feeds plus classifier)
    pub sentiment_timeout_secs: u64,
    /// Where the per-cycle status snapshot is written (None disables it)
    pub status_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_bars_required: 200,
            history_bars: 500,
            loop_sleep_seconds: 60,
            collaborator_timeout_secs: 15,
            sentiment_timeout_secs: 60,
            status_path: Some(PathBuf::from("data/status.json")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Stop-loss distance in price points
    pub sl_distance: Decimal,
    /// Take-profit distance in price points
    pub tp_distance: Decimal,
    /// Sentiment confidence at which a disagreeing verdict vetoes the trade
    pub conflict_confidence: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            sl_distance: dec!(300),
            tp_distance: dec!(600),
            conflict_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConditionConfig {
    /// Bars averaged for the volatility ratio
    pub window: usize,
    /// Below this ratio the market is too flat
    pub min_volatility_ratio: f64,
    /// Above this ratio the market is too volatile
    pub max_volatility_ratio: f64,
}

impl Default for ConditionConfig {
    fn default() -> Self {
        Self {
            window: 50,
            min_volatility_ratio: 0.001,
            max_volatility_ratio: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub enabled: bool,
    pub headline_limit: usize,
    pub max_age_minutes: i64,
    /// Per-feed HTTP timeout; feeds are fetched concurrently
    pub feed_timeout_secs: u64,
    /// RSS feeds aggregated by the news source
    pub feeds: Vec<String>,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headline_limit: 6,
            max_age_minutes: 60,
            feed_timeout_secs: 8,
            feeds: vec![
                "https://www.cnbc.com/id/100003114/device/rss/rss.html".to_string(),
                "https://feeds.a.dj.com/rss/RSSMarketsMain.xml".to_string(),
                "https://rss.nytimes.com/services/xml/rss/nyt/Business.xml".to_string(),
                "https://www.fxstreet.com/rss/news".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    /// Per-provider request timeout
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            openai_api_key: None,
            openai_model: "gpt-4.1-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ClassifierConfig {
    /// Fill missing API keys from the conventional provider env vars
    pub fn with_env_keys(mut self) -> Self {
        if self.gemini_api_key.as_deref().map_or(true, str::is_empty) {
            self.gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if self.openai_api_key.as_deref().map_or(true, str::is_empty) {
            self.openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Host of the terminal-side bridge
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub login: Option<u64>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub server: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
            login: None,
            password: None,
            server: None,
        }
    }
}

impl BridgeConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Control record file shared with the operator surface
    pub path: PathBuf,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/control.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rolling log files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("trading.symbol", "XAUUSD")?
            .set_default("bridge.host", "127.0.0.1")?
            .set_default("bridge.port", 9090)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("CONFLUENCE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (CONFLUENCE__TRADING__SYMBOL, etc.)
            .add_source(
                Environment::with_prefix("CONFLUENCE")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.classifier = cfg.classifier.with_env_keys();
        Ok(cfg)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.trading.symbol.trim().is_empty() {
            errors.push("trading.symbol must not be empty".to_string());
        }

        if self.risk.risk_per_trade_pct <= Decimal::ZERO
            || self.risk.risk_per_trade_pct > Decimal::ONE_HUNDRED
        {
            errors.push("risk_per_trade_pct must be in (0, 100]".to_string());
        }

        if self.risk.max_daily_drawdown_pct <= 0.0 {
            errors.push("max_daily_drawdown_pct must be positive".to_string());
        }

        if self.risk.max_open_trades == 0 {
            errors.push("max_open_trades must be at least 1".to_string());
        }

        if self.engine.history_bars < self.engine.min_bars_required {
            errors.push(format!(
                "history_bars ({}) must cover min_bars_required ({})",
                self.engine.history_bars, self.engine.min_bars_required
            ));
        }

        if self.engine.collaborator_timeout_secs == 0 {
            errors.push("collaborator_timeout_secs must be positive".to_string());
        }

        if self.engine.sentiment_timeout_secs == 0 {
            errors.push("sentiment_timeout_secs must be positive".to_string());
        }

        if self.sentiment.feed_timeout_secs == 0 {
            errors.push("sentiment.feed_timeout_secs must be positive".to_string());
        }

        // news fetch plus both classifier providers must fit the sentiment bound
        let sentiment_worst_case =
            self.sentiment.feed_timeout_secs + 2 * self.classifier.timeout_secs;
        if sentiment_worst_case >= self.engine.sentiment_timeout_secs {
            errors.push(format!(
                "sentiment_timeout_secs ({}) must exceed the news and classifier worst case ({})",
                self.engine.sentiment_timeout_secs, sentiment_worst_case
            ));
        }

        if self.strategy.sl_distance <= Decimal::ZERO {
            errors.push("sl_distance must be positive".to_string());
        }

        if self.strategy.tp_distance <= Decimal::ZERO {
            errors.push("tp_distance must be positive".to_string());
        }

        if self.condition.window == 0 {
            errors.push("condition.window must be at least 1".to_string());
        }

        if self.condition.min_volatility_ratio >= self.condition.max_volatility_ratio {
            errors.push("min_volatility_ratio must be below max_volatility_ratio".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn validate_collects_every_error() {
        let mut cfg = minimal();
        cfg.risk.max_open_trades = 0;
        cfg.strategy.sl_distance = Decimal::ZERO;
        cfg.engine.history_bars = 100;

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn sentiment_budget_covers_news_and_both_classifiers() {
        let cfg = minimal();
        assert_eq!(cfg.sentiment.feed_timeout_secs, 8);
        assert!(
            cfg.sentiment.feed_timeout_secs + 2 * cfg.classifier.timeout_secs
                < cfg.engine.sentiment_timeout_secs
        );

        let mut tight = minimal();
        tight.engine.sentiment_timeout_secs = 25;
        let errors = tight.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("sentiment_timeout_secs (25)"), "{}", errors[0]);

        let mut no_feed_timeout = minimal();
        no_feed_timeout.sentiment.feed_timeout_secs = 0;
        let errors = no_feed_timeout.validate().unwrap_err();
        assert_eq!(errors, vec!["sentiment.feed_timeout_secs must be positive".to_string()]);
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[trading]
symbol = "EURUSD"
timeframe_minutes = 5

[risk]
risk_per_trade_pct = "0.5"
max_daily_drawdown_pct = 2.0
max_open_trades = 1

[bridge]
host = "10.0.0.2"
port = 7001
"#,
        )
        .unwrap();

        let cfg = AppConfig::load_from(dir.path()).unwrap();
        assert_eq!(cfg.trading.symbol, "EURUSD");
        assert_eq!(cfg.trading.timeframe_minutes, 5);
        assert!(cfg.trading.dry_run);
        assert_eq!(cfg.risk.risk_per_trade_pct, dec!(0.5));
        assert_eq!(cfg.risk.max_open_trades, 1);
        assert_eq!(cfg.bridge.addr(), "10.0.0.2:7001");
        assert_eq!(cfg.engine.min_bars_required, 200);
        assert_eq!(cfg.sentiment.headline_limit, 6);
    }
}
