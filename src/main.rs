use clap::Parser;
use confluence::adapters::{ControlStore, Mt5Bridge, RssNewsFeed};
use confluence::agent::build_classifier_chain;
use confluence::cli::{self, Cli, Commands};
use confluence::config::AppConfig;
use confluence::coordination::{install_signal_handlers, GracefulShutdown};
use confluence::error::ConfluenceError;
use confluence::exchange::BrokerGateway;
use confluence::services::StatusWriter;
use confluence::strategy::DecisionEngine;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, warn};

mod main_runtime;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match AppConfig::load_from(&cli.config_dir) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Failed to load configuration from {}: {}",
                cli.config_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };
    if cli.dry_run {
        config.trading.dry_run = true;
    }

    main_runtime::init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("Invalid configuration: {}", e);
        }
        return ExitCode::FAILURE;
    }

    match dispatch(cli.command.unwrap_or(Commands::Run), config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Control { action } => {
            let store = ControlStore::new(config.control.path.clone());
            let status = config.engine.status_path.clone().map(StatusWriter::new);
            cli::run_control(&store, status.as_ref(), &action).await?;
        }
        Commands::Check => run_check(&config).await?,
        Commands::Once => {
            let bridge = connect_bridge(&config).await?;
            let mut engine = build_engine(&config, bridge)?;
            let report = engine.run_cycle().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            engine.close().await?;
        }
        Commands::Run => {
            let bridge = connect_bridge(&config).await?;
            let mut engine = build_engine(&config, bridge)?;

            let shutdown = Arc::new(GracefulShutdown::new());
            install_signal_handlers(shutdown.clone());

            engine.run(shutdown.token()).await?;
            info!("Shutdown complete");
        }
    }
    Ok(())
}

/// Connect before the first cycle; an unreachable bridge is fatal at startup
async fn connect_bridge(config: &AppConfig) -> anyhow::Result<Arc<Mt5Bridge>> {
    let bridge = Arc::new(Mt5Bridge::new(
        config.bridge.clone(),
        config.trading.symbol.clone(),
        config.trading.timeframe_minutes,
    ));

    let secs = config.engine.collaborator_timeout_secs;
    tokio::time::timeout(Duration::from_secs(secs), bridge.connect())
        .await
        .map_err(|_| ConfluenceError::timeout("bridge connect", secs))??;
    Ok(bridge)
}

fn build_engine(config: &AppConfig, bridge: Arc<Mt5Bridge>) -> anyhow::Result<DecisionEngine> {
    let news = Arc::new(RssNewsFeed::from_config(&config.sentiment)?);
    let classifier = Arc::new(build_classifier_chain(&config.classifier)?);

    if !config.trading.dry_run {
        warn!("LIVE trading enabled for {}: orders will reach the broker", config.trading.symbol);
    }

    Ok(DecisionEngine::new(config, bridge, news, classifier))
}

async fn run_check(config: &AppConfig) -> anyhow::Result<()> {
    println!("configuration:   ok");
    println!(
        "trading:         {} M{} dry_run={}",
        config.trading.symbol, config.trading.timeframe_minutes, config.trading.dry_run
    );
    println!("bridge:          {}", config.bridge.addr());

    let classifiers = build_classifier_chain(&config.classifier)?;
    println!("classifiers:     {}", classifiers.len());

    let bridge = connect_bridge(config).await?;
    println!("bridge connect:  ok");

    let account = bridge.account_state(&config.trading.symbol).await?;
    println!(
        "account:         equity={} open_positions={}",
        account.equity, account.open_positions
    );

    let spec = bridge.instrument(&config.trading.symbol).await?;
    println!(
        "instrument:      contract={} point={} volume=[{}, {}]",
        spec.contract_size, spec.point, spec.volume_min, spec.volume_max
    );

    bridge.shutdown().await?;
    Ok(())
}
