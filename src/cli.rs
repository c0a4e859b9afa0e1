use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::adapters::ControlStore;
use crate::domain::{ControlRecord, TradingMode};
use crate::error::Result;
use crate::services::StatusWriter;

#[derive(Parser)]
#[command(name = "confluence")]
#[command(version)]
#[command(
    about = "Technical + sentiment trading loop for a MetaTrader 5 bridge",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration directory (default.toml plus $CONFLUENCE_ENV overrides)
    #[arg(short, long, default_value = "config", env = "CONFLUENCE_CONFIG_DIR")]
    pub config_dir: PathBuf,

    /// Force dry run regardless of configuration
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the decision loop until SIGINT/SIGTERM (default)
    Run,
    /// Run a single cycle and print its report
    Once,
    /// Inspect or change the operator control record
    Control {
        #[command(subcommand)]
        action: ControlCommand,
    },
    /// Validate configuration and test the bridge connection
    Check,
}

#[derive(Subcommand)]
pub enum ControlCommand {
    /// Print the control record and the last status snapshot
    Show,
    /// Allow new entries
    Enable,
    /// Block new entries
    Disable,
    /// Switch the trading mode
    Mode {
        /// SAFE, BALANCED, AGGRESSIVE or SCALPING_M5
        mode: TradingMode,
    },
}

fn print_record(record: &ControlRecord) {
    println!("trading_enabled: {}", record.trading_enabled);
    println!("mode:            {}", record.mode);
    let profile = record.mode.profile();
    println!(
        "profile:         confidence >= {:.2}, lot {}",
        profile.confidence_threshold, profile.lot_size
    );
}

/// Apply a control subcommand and print the resulting record
pub async fn run_control(
    store: &ControlStore,
    status: Option<&StatusWriter>,
    action: &ControlCommand,
) -> Result<()> {
    let record = match action {
        ControlCommand::Show => store.load().await,
        ControlCommand::Enable => store.set_enabled(true).await?,
        ControlCommand::Disable => store.set_enabled(false).await?,
        ControlCommand::Mode { mode } => store.set_mode(*mode).await?,
    };

    println!("control file:    {}", store.path().display());
    print_record(&record);

    if let ControlCommand::Show = action {
        match status {
            Some(writer) => match writer.read().await {
                Some(snapshot) => {
                    println!();
                    println!("last cycle:      {} ({})", snapshot.timestamp, snapshot.outcome);
                    if let Some(decision) = &snapshot.decision {
                        println!("decision:        {} {}", decision.action, decision.reason);
                    }
                    if let Some(risk) = &snapshot.risk {
                        println!(
                            "risk:            allowed={} lot={} {}",
                            risk.allowed, risk.lot_size, risk.reason
                        );
                    }
                    if let Some(error) = &snapshot.error {
                        println!("error:           {}", error);
                    }
                }
                None => println!("\nno status snapshot at {}", writer.path().display()),
            },
            None => println!("\nstatus snapshot disabled"),
        }
    }

    Ok(())
}
