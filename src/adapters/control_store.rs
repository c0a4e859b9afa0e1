use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::domain::{ControlRecord, TradingMode};
use crate::error::Result;

/// JSON file holding the operator's enable flag and mode.
///
/// The decision loop only ever calls [`ControlStore::load`]; the write side
/// belongs to the operator CLI.
#[derive(Debug, Clone)]
pub struct ControlStore {
    path: PathBuf,
}

impl ControlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record. A missing or unreadable file yields the default
    /// `{trading_enabled: true, mode: SAFE}`.
    pub async fn load(&self) -> ControlRecord {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Control file {} missing, using defaults", self.path.display());
                return ControlRecord::default();
            }
            Err(e) => {
                warn!("Control file {} unreadable: {}", self.path.display(), e);
                return ControlRecord::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Control file {} malformed: {}", self.path.display(), e);
                ControlRecord::default()
            }
        }
    }

    /// Replace the record. Written to a sibling temp file and renamed so a
    /// concurrent reader never sees a half-written file.
    pub async fn save(&self, record: &ControlRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(record)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(
            "Control updated: trading_enabled={}, mode={}",
            record.trading_enabled, record.mode
        );
        Ok(())
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<ControlRecord> {
        let mut record = self.load().await;
        record.trading_enabled = enabled;
        self.save(&record).await?;
        Ok(record)
    }

    pub async fn set_mode(&self, mode: TradingMode) -> Result<ControlRecord> {
        let mut record = self.load().await;
        record.mode = mode;
        self.save(&record).await?;
        Ok(record)
    }
}
