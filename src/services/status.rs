//! Per-cycle status snapshot for an external dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::{
    ConditionVerdict, Decision, OrderReceipt, RiskDecision, SentimentVerdict, TechnicalSignal,
    TradingMode,
};
use crate::error::Result;
use crate::strategy::engine::{CycleOutcome, CycleReport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub timeframe_minutes: u32,
    pub dry_run: bool,
    pub mode: TradingMode,
    pub trading_enabled: bool,
    pub outcome: CycleOutcome,
    pub bars: usize,
    pub technical: Option<TechnicalSignal>,
    pub sentiment: Option<SentimentVerdict>,
    pub condition: Option<ConditionVerdict>,
    pub decision: Option<Decision>,
    pub risk: Option<RiskDecision>,
    pub order: Option<OrderReceipt>,
    pub daily_pl_pct: Option<f64>,
    pub error: Option<String>,
}

impl StatusSnapshot {
    pub fn from_report(
        symbol: &str,
        timeframe_minutes: u32,
        dry_run: bool,
        report: &CycleReport,
    ) -> Self {
        let control = report.control.unwrap_or_default();
        Self {
            timestamp: report.finished_at,
            symbol: symbol.to_string(),
            timeframe_minutes,
            dry_run,
            mode: control.mode,
            trading_enabled: control.trading_enabled,
            outcome: report.outcome,
            bars: report.bars,
            technical: report.technical,
            sentiment: report.sentiment.clone(),
            condition: report.condition.clone(),
            decision: report.decision.clone(),
            risk: report.risk.clone(),
            order: report.order.clone(),
            daily_pl_pct: report.daily_pl_pct,
            error: report.error.clone(),
        }
    }
}

/// Writes the latest snapshot as pretty JSON, replacing the previous one
#[derive(Debug, Clone)]
pub struct StatusWriter {
    path: PathBuf,
}

impl StatusWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, snapshot: &StatusSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Status written to {}", self.path.display());
        Ok(())
    }

    /// Log-and-continue variant used by the decision loop
    pub async fn write_or_warn(&self, snapshot: &StatusSnapshot) {
        if let Err(e) = self.write(snapshot).await {
            warn!("Failed to write status {}: {}", self.path.display(), e);
        }
    }

    /// Last snapshot on disk, if any
    pub async fn read(&self) -> Option<StatusSnapshot> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        serde_json::from_str(&raw)
            .map_err(|e| warn!("Status file {} unreadable: {}", self.path.display(), e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Action, ControlRecord};
    use rust_decimal_macros::dec;

    fn report() -> CycleReport {
        let mut report = CycleReport::new(Utc::now());
        report.outcome = CycleOutcome::Executed;
        report.bars = 300;
        report.control = Some(ControlRecord {
            trading_enabled: true,
            mode: TradingMode::Balanced,
        });
        report.decision = Some(Decision {
            action: Action::Buy,
            reason: "tech_buy_sent_neutral".to_string(),
            sl_distance: dec!(300),
            tp_distance: dec!(600),
            lot: dec!(0.02),
        });
        report.risk = Some(RiskDecision::approve(dec!(0.33)));
        report
    }

    #[tokio::test]
    async fn writes_and_reads_back_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let writer = StatusWriter::new(dir.path().join("data").join("status.json"));
        let snapshot = StatusSnapshot::from_report("XAUUSD", 15, true, &report());

        writer.write(&snapshot).await.unwrap();
        let back = writer.read().await.unwrap();
        assert_eq!(back, snapshot);

        let raw = std::fs::read_to_string(writer.path()).unwrap();
        assert!(raw.contains("\"mode\": \"BALANCED\""));
        assert!(raw.contains("\"outcome\": \"executed\""));
        assert!(raw.contains("\"action\": \"BUY\""));
    }

    #[tokio::test]
    async fn write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("status.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        let writer = StatusWriter::new(&path);
        let snapshot = StatusSnapshot::from_report("XAUUSD", 15, true, &report());
        assert!(writer.write(&snapshot).await.is_err());
        writer.write_or_warn(&snapshot).await;
    }

    #[tokio::test]
    async fn missing_status_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StatusWriter::new(dir.path().join("none.json")).read().await.is_none());
    }
}
