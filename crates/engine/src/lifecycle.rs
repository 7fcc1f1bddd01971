use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use common::{
    granularity_to_duration, BotParameters, BotState, BrokerClient, Config, Error, Instrument,
    OrderResult, Result, Signal,
};
use strategy::{BotDefinition, Strategy};

use crate::executor::OrderExecutor;
use crate::universe::{instruments_without_positions, tradable_instruments};

/// Loop tuning shared by every bot in the process.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    /// Upper bound on each broker call.
    pub call_timeout: Duration,
    /// Upper bound on instruments evaluated at once within a cycle.
    pub max_concurrent_evaluations: usize,
    pub currencies_only: bool,
}

impl RunnerSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            call_timeout: cfg.request_timeout,
            max_concurrent_evaluations: cfg.max_concurrent_evaluations,
            currencies_only: cfg.currencies_only,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(10),
            max_concurrent_evaluations: 16,
            currencies_only: true,
        }
    }
}

/// What happened to one instrument in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentOutcome {
    /// The strategy saw nothing worth trading.
    Neutral,
    /// The strategy signalled but the sizer declined (zero units).
    Declined(Signal),
    Submitted(OrderResult),
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub bot: String,
    pub cycle: u64,
    /// Instruments evaluated this cycle.
    pub eligible: usize,
    pub placed: usize,
    pub declined: usize,
    pub neutral: usize,
    pub failed: usize,
    /// Set when the universe could not be fetched and nothing was evaluated.
    pub filter_error: Option<String>,
}

/// Running totals over a bot's cycle reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotals {
    pub cycles: u64,
    pub placed: u64,
    pub declined: u64,
    pub failed: u64,
    /// Cycles that evaluated nothing because the universe could not be fetched.
    pub skipped_cycles: u64,
}

impl CycleTotals {
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.placed += report.placed as u64;
        self.declined += report.declined as u64;
        self.failed += report.failed as u64;
        if report.filter_error.is_some() {
            self.skipped_cycles += 1;
        }
    }
}

/// Cloneable handle for observing a running bot.
#[derive(Clone)]
pub struct BotHandle {
    name: String,
    state: Arc<RwLock<BotState>>,
    report_tx: broadcast::Sender<CycleReport>,
}

impl BotHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn state(&self) -> BotState {
        *self.state.read().await
    }

    /// Subscribe to cycle reports. Only reports sent after subscribing are seen.
    pub fn subscribe_reports(&self) -> broadcast::Receiver<CycleReport> {
        self.report_tx.subscribe()
    }
}

/// Per-instrument pipeline: candles -> signal -> order -> submit.
struct Evaluator {
    broker: Arc<dyn BrokerClient>,
    strategy: Arc<dyn Strategy>,
    executor: OrderExecutor,
    params: BotParameters,
    call_timeout: Duration,
}

impl Evaluator {
    async fn evaluate(&self, instrument: &Instrument) -> Result<InstrumentOutcome> {
        let fetch = self.broker.candles(
            &instrument.name,
            self.params.candle_count,
            &self.params.candle_granularity,
        );
        let candles = tokio::time::timeout(self.call_timeout, fetch)
            .await
            .map_err(|_| Error::Fetch(format!("candle fetch for {} timed out", instrument.name)))??;

        let signal = self.strategy.evaluate(&candles);
        let Some(last) = candles.last() else {
            return Ok(InstrumentOutcome::Neutral);
        };
        if signal == Signal::Neutral {
            return Ok(InstrumentOutcome::Neutral);
        }

        match risk::build_order(signal, last, instrument, &self.params) {
            Some(order) => self.executor.submit(&order).await.map(InstrumentOutcome::Submitted),
            None => Ok(InstrumentOutcome::Declined(signal)),
        }
    }
}

/// One bot's polling loop: filter the universe, evaluate every eligible
/// instrument concurrently, wait for all of them, sleep one candle, repeat.
pub struct BotRunner {
    name: String,
    cycle_interval: Duration,
    settings: RunnerSettings,
    broker: Arc<dyn BrokerClient>,
    evaluator: Arc<Evaluator>,
    state: Arc<RwLock<BotState>>,
    report_tx: broadcast::Sender<CycleReport>,
}

impl BotRunner {
    /// Fails with `Error::Config` if the bot's candle granularity cannot be
    /// parsed; such a bot must not start.
    pub fn new(
        definition: &BotDefinition,
        broker: Arc<dyn BrokerClient>,
        strategy: Arc<dyn Strategy>,
        settings: RunnerSettings,
    ) -> Result<(Self, BotHandle)> {
        let cycle_interval = granularity_to_duration(&definition.params.candle_granularity)?;
        if settings.max_concurrent_evaluations == 0 {
            return Err(Error::Config("max_concurrent_evaluations must be positive".into()));
        }

        let (report_tx, _) = broadcast::channel(64);
        let state = Arc::new(RwLock::new(BotState::Idle));

        let evaluator = Arc::new(Evaluator {
            broker: broker.clone(),
            strategy,
            executor: OrderExecutor::new(broker.clone(), settings.call_timeout),
            params: definition.params.clone(),
            call_timeout: settings.call_timeout,
        });

        let handle = BotHandle {
            name: definition.name.clone(),
            state: state.clone(),
            report_tx: report_tx.clone(),
        };

        let runner = BotRunner {
            name: definition.name.clone(),
            cycle_interval,
            settings,
            broker,
            evaluator,
            state,
            report_tx,
        };

        Ok((runner, handle))
    }

    pub fn cycle_interval(&self) -> Duration {
        self.cycle_interval
    }

    /// Run the bot forever. Call from `tokio::spawn`.
    pub async fn run(self) {
        info!(
            bot = %self.name,
            strategy = %self.evaluator.strategy.name(),
            interval = ?self.cycle_interval,
            "Bot started"
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            let report = self.run_cycle(cycle).await;
            // No subscribers is fine
            let _ = self.report_tx.send(report);

            self.set_state(BotState::Waiting).await;
            debug!(bot = %self.name, "Waiting for next candle");
            tokio::time::sleep(self.cycle_interval).await;
        }
    }

    /// Filter, fan out, and join one full cycle.
    pub async fn run_cycle(&self, cycle: u64) -> CycleReport {
        let mut report = CycleReport {
            bot: self.name.clone(),
            cycle,
            ..CycleReport::default()
        };

        self.set_state(BotState::Filtering).await;
        let eligible = match self.eligible_instruments().await {
            Ok(eligible) => eligible,
            Err(e) => {
                warn!(bot = %self.name, error = %e, "Could not filter instruments, skipping cycle");
                report.filter_error = Some(e.to_string());
                return report;
            }
        };
        report.eligible = eligible.len();
        info!(bot = %self.name, instruments = eligible.len(), "Running cycle");

        self.set_state(BotState::Evaluating).await;
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_evaluations));
        let mut tasks = JoinSet::new();

        for instrument in eligible {
            let evaluator = self.evaluator.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let outcome: Result<InstrumentOutcome> = async {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|_| Error::Other("evaluation semaphore closed".into()))?;
                    evaluator.evaluate(&instrument).await
                }
                .await;
                (instrument.name, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(InstrumentOutcome::Submitted(_)))) => report.placed += 1,
                Ok((instrument, Ok(InstrumentOutcome::Declined(signal)))) => {
                    debug!(bot = %self.name, %instrument, %signal, "Signal declined by sizer");
                    report.declined += 1;
                }
                Ok((_, Ok(InstrumentOutcome::Neutral))) => report.neutral += 1,
                Ok((instrument, Err(e @ Error::OrderRejected { .. }))) => {
                    warn!(bot = %self.name, %instrument, error = %e, "Order rejected");
                    report.failed += 1;
                }
                Ok((instrument, Err(e))) => {
                    warn!(bot = %self.name, %instrument, error = %e, "Evaluation failed, skipping instrument");
                    report.failed += 1;
                }
                Err(e) => {
                    error!(bot = %self.name, error = %e, "Evaluation task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            bot = %self.name,
            cycle,
            placed = report.placed,
            declined = report.declined,
            failed = report.failed,
            "Placed {} trades",
            report.placed
        );
        report
    }

    async fn eligible_instruments(&self) -> Result<Vec<Instrument>> {
        let timeout = self.settings.call_timeout;

        let instruments = tokio::time::timeout(timeout, self.broker.account_instruments())
            .await
            .map_err(|_| Error::Fetch("instrument listing timed out".into()))??;
        let positions = tokio::time::timeout(timeout, self.broker.open_positions())
            .await
            .map_err(|_| Error::Fetch("open position listing timed out".into()))??;

        let tradable = tradable_instruments(instruments, self.settings.currencies_only);
        Ok(instruments_without_positions(&tradable, &positions))
    }

    async fn set_state(&self, state: BotState) {
        *self.state.write().await = state;
    }
}
