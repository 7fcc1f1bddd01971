pub mod config;
pub mod indicators;
pub mod momentum_sma;

pub use config::{BotDefinition, BotFileConfig};
pub use momentum_sma::{Assessment, MomentumSmaStrategy};

use common::{Candle, Signal};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Evaluate a chronological candle window for one instrument.
    ///
    /// Returns `Signal::Neutral` when there is nothing to do, including when
    /// the window is too short to say anything.
    fn evaluate(&self, candles: &[Candle]) -> Signal;
}
