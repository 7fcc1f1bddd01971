use tracing::debug;

use common::{BotParameters, Candle, Signal};

use crate::indicators::{momentum, relative_strength_index, simple_moving_average, standard_deviation};
use crate::Strategy;

/// Every intermediate value behind one decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub momentum: f64,
    pub sma: f64,
    /// Placeholder stage, not part of the decision.
    pub rsi: f64,
    /// Placeholder stage, not part of the decision.
    pub stdev: f64,
    pub last_bid_close: f64,
    pub last_ask_close: f64,
    pub signal: Signal,
}

/// Mean reversion against the SMA, confirmed by momentum.
///
/// Long when the SMA sits above the last ask close and momentum is rising;
/// short when the SMA sits below the last bid close and momentum is falling.
#[derive(Debug, Clone)]
pub struct MomentumSmaStrategy {
    name: String,
    momentum_period: usize,
    sma_period: usize,
    rsi_period: usize,
    stdev_period: usize,
}

impl MomentumSmaStrategy {
    pub fn new(name: impl Into<String>, params: &BotParameters) -> Self {
        Self {
            name: name.into(),
            momentum_period: params.momentum_period,
            sma_period: params.sma_period,
            rsi_period: params.rsi_period,
            stdev_period: params.stdev_period,
        }
    }

    /// Compute all indicators for the window. `None` for windows of fewer
    /// than two candles, or when the SMA window would be empty.
    pub fn assess(&self, candles: &[Candle]) -> Option<Assessment> {
        if candles.len() < 2 || self.sma_period == 0 {
            return None;
        }
        let last = candles.last()?;

        let momentum = momentum(candles, self.momentum_period);
        let sma = simple_moving_average(candles, self.sma_period);
        let rsi = relative_strength_index(candles, self.rsi_period);
        let stdev = standard_deviation(candles, self.stdev_period);

        Some(Assessment {
            momentum,
            sma,
            rsi,
            stdev,
            last_bid_close: last.bid.close,
            last_ask_close: last.ask.close,
            signal: decide(sma, momentum, last),
        })
    }
}

/// The decision rule on its own.
pub fn decide(sma: f64, momentum: f64, last: &Candle) -> Signal {
    if sma > last.ask.close && momentum > 0.0 {
        Signal::Long
    } else if sma < last.bid.close && momentum < 0.0 {
        Signal::Short
    } else {
        Signal::Neutral
    }
}

impl Strategy for MomentumSmaStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        match self.assess(candles) {
            Some(a) => {
                debug!(
                    strategy = %self.name,
                    momentum = a.momentum,
                    sma = a.sma,
                    rsi = a.rsi,
                    stdev = a.stdev,
                    signal = %a.signal,
                    "Assessed candle window"
                );
                a.signal
            }
            None => Signal::Neutral,
        }
    }
}
