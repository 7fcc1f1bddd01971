use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{BrokerClient, Config, TradingMode};
use engine::{BotHandle, BotRunner, CycleReport, CycleTotals, OandaClient, RunnerSettings};
use paper::PaperBroker;
use strategy::{BotDefinition, BotFileConfig, MomentumSmaStrategy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading environment config")?;
    info!(mode = %cfg.trading_mode, url = %cfg.oanda_base_url, "fxbot starting");

    info!(path = %cfg.bots_config_path, "Loading bots");
    let bot_file = BotFileConfig::load(&cfg.bots_config_path).context("loading bot definitions")?;
    let settings = RunnerSettings::from_config(&cfg);

    // ── Bots ──────────────────────────────────────────────────────────────────
    // One independent task per bot; a bot that fails to configure is skipped.
    let mut bots = JoinSet::new();
    let mut monitors = JoinSet::new();
    for definition in &bot_file.bots {
        match build_runner(&cfg, definition, settings.clone()) {
            Ok((runner, handle)) => {
                // Subscribe before the first cycle can run
                let reports = handle.subscribe_reports();
                monitors.spawn(log_cycle_totals(handle, reports));
                bots.spawn(runner.run());
            }
            Err(e) => {
                error!(bot = %definition.name, error = %e, "Bot refused to start");
            }
        }
    }

    if bots.is_empty() {
        bail!("no bot could be started");
    }
    info!(bots = bots.len(), "All bots started. Waiting for shutdown signal.");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for shutdown signal")?;
            info!("Shutdown signal received. Exiting.");
        }
        Some(joined) = bots.join_next() => {
            // Bot loops never return on their own
            if let Err(e) = joined {
                warn!(error = %e, "A bot task stopped unexpectedly");
            }
            bail!("bot task exited");
        }
    }

    bots.shutdown().await;
    monitors.shutdown().await;
    Ok(())
}

/// Wire one bot to its own broker connection and strategy.
fn build_runner(
    cfg: &Config,
    definition: &BotDefinition,
    settings: RunnerSettings,
) -> common::Result<(BotRunner, BotHandle)> {
    let oanda = Arc::new(OandaClient::new(
        cfg.oanda_base_url.clone(),
        &cfg.oanda_api_key,
        &definition.account,
        cfg.request_timeout,
    )?);

    // Exchange client injected based on TRADING_MODE
    let broker: Arc<dyn BrokerClient> = match cfg.trading_mode {
        TradingMode::Live | TradingMode::Practice => oanda,
        TradingMode::Paper => Arc::new(PaperBroker::new(oanda, cfg.paper_slippage_bps)),
    };

    let strategy = Arc::new(MomentumSmaStrategy::new(
        definition.name.clone(),
        &definition.params,
    ));

    let (runner, handle) = BotRunner::new(definition, broker, strategy, settings)?;
    info!(
        bot = %definition.name,
        account = %definition.account,
        granularity = %definition.params.candle_granularity,
        interval = ?runner.cycle_interval(),
        "Bot configured"
    );
    Ok((runner, handle))
}

/// Log a bot's running totals after every cycle until the bot stops.
async fn log_cycle_totals(handle: BotHandle, mut reports: broadcast::Receiver<CycleReport>) {
    let mut totals = CycleTotals::default();
    loop {
        match reports.recv().await {
            Ok(report) => {
                totals.record(&report);
                let state = handle.state().await;
                info!(
                    bot = %handle.name(),
                    state = %state,
                    cycles = totals.cycles,
                    placed = totals.placed,
                    declined = totals.declined,
                    failed = totals.failed,
                    skipped_cycles = totals.skipped_cycles,
                    "Bot totals"
                );
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(bot = %handle.name(), missed, "Cycle reports dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
