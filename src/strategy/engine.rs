//! Cycle driver: fetch, analyse, decide, gate, execute, report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{
    ConditionFilter, DailyPnlTracker, Orchestrator, RiskGovernor, RiskRequest, TechnicalEngine,
};
use crate::adapters::{ControlStore, NewsSource, OrderExecutor};
use crate::agent::{SentimentClassifier, TextClassifier};
use crate::config::{AppConfig, EngineConfig};
use crate::coordination::ShutdownToken;
use crate::domain::{
    validate_series, ConditionVerdict, ControlRecord, Decision, OrderReceipt, RiskDecision,
    SentimentVerdict, TechnicalSignal,
};
use crate::error::{ConfluenceError, Result};
use crate::exchange::BrokerGateway;
use crate::services::status::{StatusSnapshot, StatusWriter};

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Price history could not be fetched or was malformed
    DataUnavailable,
    /// Fewer bars than the indicators need
    InsufficientData,
    Hold,
    /// The risk governor blocked the trade
    Rejected,
    Executed,
    ExecutionFailed,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::DataUnavailable => "data_unavailable",
            CycleOutcome::InsufficientData => "insufficient_data",
            CycleOutcome::Hold => "hold",
            CycleOutcome::Rejected => "rejected",
            CycleOutcome::Executed => "executed",
            CycleOutcome::ExecutionFailed => "execution_failed",
        }
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything one cycle produced. Sections stay `None` when the cycle
/// stopped before reaching them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub bars: usize,
    pub control: Option<ControlRecord>,
    pub technical: Option<TechnicalSignal>,
    pub condition: Option<ConditionVerdict>,
    pub sentiment: Option<SentimentVerdict>,
    pub decision: Option<Decision>,
    pub risk: Option<RiskDecision>,
    pub order: Option<OrderReceipt>,
    pub daily_pl_pct: Option<f64>,
    pub error: Option<String>,
}

impl CycleReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            outcome: CycleOutcome::DataUnavailable,
            bars: 0,
            control: None,
            technical: None,
            condition: None,
            sentiment: None,
            decision: None,
            risk: None,
            order: None,
            daily_pl_pct: None,
            error: None,
        }
    }
}

/// Single-instrument decision loop
pub struct DecisionEngine {
    symbol: String,
    timeframe_minutes: u32,
    dry_run: bool,
    settings: EngineConfig,
    broker: Arc<dyn BrokerGateway>,
    executor: OrderExecutor,
    sentiment: SentimentClassifier,
    control: ControlStore,
    technical: TechnicalEngine,
    condition: ConditionFilter,
    orchestrator: Orchestrator,
    risk: RiskGovernor,
    daily_pnl: DailyPnlTracker,
    status: Option<StatusWriter>,
    cycles: u64,
}

impl DecisionEngine {
    pub fn new(
        config: &AppConfig,
        broker: Arc<dyn BrokerGateway>,
        news: Arc<dyn NewsSource>,
        classifier: Arc<dyn TextClassifier>,
    ) -> Self {
        let executor = OrderExecutor::new(
            broker.clone(),
            config.trading.symbol.clone(),
            config.trading.dry_run,
        );
        let sentiment = SentimentClassifier::new(news, classifier, config.sentiment.clone());

        Self {
            symbol: config.trading.symbol.clone(),
            timeframe_minutes: config.trading.timeframe_minutes,
            dry_run: config.trading.dry_run,
            settings: config.engine.clone(),
            broker,
            executor,
            sentiment,
            control: ControlStore::new(config.control.path.clone()),
            technical: TechnicalEngine::default(),
            condition: ConditionFilter::new(config.condition.clone()),
            orchestrator: Orchestrator::new(&config.strategy),
            risk: RiskGovernor::new(config.risk.clone()),
            daily_pnl: DailyPnlTracker::new(),
            status: config.engine.status_path.clone().map(StatusWriter::new),
            cycles: 0,
        }
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Bound a collaborator call by the configured timeout
    async fn bounded<T, F>(&self, operation: &str, secs: u64, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(Duration::from_secs(secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(ConfluenceError::timeout(operation, secs)),
        }
    }

    /// Run one full cycle. Never fails: every problem ends the cycle with an
    /// outcome and, where relevant, an error message.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport::new(Utc::now());

        self.evaluate(&mut report).await;
        report.finished_at = Utc::now();

        match (&report.decision, &report.risk) {
            (Some(decision), Some(risk)) => info!(
                "Cycle {} [{}]: {} reason={} | risk allowed={} lot={} reason={}",
                self.cycles,
                report.outcome,
                decision.action,
                decision.reason,
                risk.allowed,
                risk.lot_size,
                risk.reason
            ),
            _ => info!(
                "Cycle {} [{}]: bars={} {}",
                self.cycles,
                report.outcome,
                report.bars,
                report.error.as_deref().unwrap_or("")
            ),
        }

        if let Some(status) = &self.status {
            let snapshot = StatusSnapshot::from_report(
                &self.symbol,
                self.timeframe_minutes,
                self.dry_run,
                &report,
            );
            status.write_or_warn(&snapshot).await;
        }

        report
    }

    async fn evaluate(&mut self, report: &mut CycleReport) {
        let timeout = self.settings.collaborator_timeout_secs;

        // Snapshot for the whole cycle; operator changes apply from the next one
        let control = self.control.load().await;
        debug!(
            "Control: trading_enabled={}, mode={}",
            control.trading_enabled, control.mode
        );
        report.control = Some(control);

        let bars = match self
            .bounded("get_history", timeout, self.broker.get_history(self.settings.history_bars))
            .await
        {
            Ok(bars) => bars,
            Err(e) => {
                warn!("Failed to fetch history: {}", e);
                report.outcome = CycleOutcome::DataUnavailable;
                report.error = Some(e.to_string());
                return;
            }
        };
        report.bars = bars.len();

        if let Err(e) = validate_series(&bars) {
            warn!("Rejecting price history: {}", e);
            report.outcome = CycleOutcome::DataUnavailable;
            report.error = Some(e.to_string());
            return;
        }

        if bars.len() < self.settings.min_bars_required {
            warn!(
                "Not enough bars ({} < {}), skipping cycle",
                bars.len(),
                self.settings.min_bars_required
            );
            report.outcome = CycleOutcome::InsufficientData;
            return;
        }

        let technical = self.technical.analyze(&bars);
        let condition = self.condition.analyze(&bars);

        let sentiment = match tokio::time::timeout(
            Duration::from_secs(self.settings.sentiment_timeout_secs),
            self.sentiment.analyze(&self.symbol),
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                warn!("Sentiment timed out after {}s", self.settings.sentiment_timeout_secs);
                SentimentVerdict::neutral(0.1, "exception")
            }
        };

        // Fetched every completed cycle so the day's opening equity is seen early
        let account = match self
            .bounded("account_state", timeout, self.broker.account_state(&self.symbol))
            .await
        {
            Ok(account) => Some(account),
            Err(e) => {
                warn!("Account state unavailable: {}", e);
                None
            }
        };
        let daily_pl_pct = account.as_ref().and_then(|a| self.daily_pnl.observe(a.equity));
        report.daily_pl_pct = daily_pl_pct;

        let decision = self.orchestrator.decide(&technical, &sentiment, &condition, &control);

        report.technical = Some(technical);
        report.condition = Some(condition);
        report.sentiment = Some(sentiment);

        if decision.is_hold() {
            report.outcome = CycleOutcome::Hold;
            report.risk = Some(RiskDecision::reject("not_evaluated"));
            report.decision = Some(decision);
            return;
        }

        let instrument = match self
            .bounded("instrument", timeout, self.broker.instrument(&self.symbol))
            .await
        {
            Ok(spec) => Some(spec),
            Err(e) => {
                warn!("Instrument spec unavailable: {}", e);
                None
            }
        };

        let request = RiskRequest {
            symbol: self.symbol.clone(),
            sl_distance: decision.sl_distance,
            daily_pl_pct,
        };
        let risk = self.risk.evaluate(&request, account.as_ref(), instrument.as_ref());

        if !risk.allowed {
            report.outcome = CycleOutcome::Rejected;
        } else {
            match self
                .bounded("submit_order", timeout, self.executor.execute(&decision, risk.lot_size))
                .await
            {
                Ok(receipt) => {
                    report.outcome = CycleOutcome::Executed;
                    report.order = Some(receipt);
                }
                Err(e) => {
                    error!("Execution failed: {}", e);
                    report.outcome = CycleOutcome::ExecutionFailed;
                    report.error = Some(e.to_string());
                }
            }
        }

        report.risk = Some(risk);
        report.decision = Some(decision);
    }

    /// Cycle until shutdown is requested, then close the broker session.
    ///
    /// A request arriving mid-cycle takes effect once the cycle finishes.
    pub async fn run(&mut self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(
            "Decision loop starting: symbol={}, tf={}m, dry_run={}, sleep={}s",
            self.symbol, self.timeframe_minutes, self.dry_run, self.settings.loop_sleep_seconds
        );

        while !shutdown.is_shutdown_requested() {
            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(self.settings.loop_sleep_seconds)) => {}
                signal = shutdown.wait_for_shutdown() => {
                    info!("Stopping decision loop ({})", signal);
                    break;
                }
            }
        }

        self.close().await
    }

    /// Close the broker session
    pub async fn close(&self) -> Result<()> {
        info!("Closing broker session after {} cycles", self.cycles);
        self.bounded("shutdown", self.settings.collaborator_timeout_secs, self.broker.shutdown())
            .await
    }
}
