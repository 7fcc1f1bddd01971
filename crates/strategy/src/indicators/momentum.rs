use common::Candle;

use super::sma::mid_close_average;

/// Momentum as the difference between two adjacent windowed averages.
///
/// The trailing `min(period, len)` candles are split into two equal halves
/// of `min(period, len) / 2` candles each, the second ending at the last
/// candle. Returns `avg(second half) - avg(first half)` of the mid close.
/// Windows of 0 or 1 candles produce two empty halves and a momentum of 0.
pub fn momentum(candles: &[Candle], period: usize) -> f64 {
    let len = candles.len();
    let half = period.min(len) / 2;

    let first = &candles[len - 2 * half..len - half];
    let second = &candles[len - half..];

    mid_close_average(second) - mid_close_average(first)
}
