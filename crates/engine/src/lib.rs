pub mod executor;
pub mod lifecycle;
pub mod oanda;
pub mod universe;

pub use executor::OrderExecutor;
pub use lifecycle::{BotHandle, BotRunner, CycleReport, CycleTotals, InstrumentOutcome, RunnerSettings};
pub use oanda::OandaClient;
pub use universe::{instruments_without_positions, tradable_instruments};
