use common::Candle;

/// Mean of the mid close over the whole slice.
///
/// The divisor is floored at 1, so an empty slice averages to zero.
pub fn mid_close_average(candles: &[Candle]) -> f64 {
    let sum: f64 = candles.iter().map(|c| c.mid.close).sum();
    sum / candles.len().max(1) as f64
}

/// Simple moving average of the mid close over the trailing `period` candles.
/// A period longer than the window uses the whole window.
pub fn simple_moving_average(candles: &[Candle], period: usize) -> f64 {
    let start = candles.len().saturating_sub(period);
    mid_close_average(&candles[start..])
}
