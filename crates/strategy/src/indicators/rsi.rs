use common::Candle;

/// Value reported by the RSI stage until a real indicator replaces it.
pub const PLACEHOLDER_RSI: f64 = 1.0;

/// RSI (Relative Strength Index) stage.
///
/// Contract: returns a value in `[0, 100]` for the trailing `period` candles.
/// This stage is a placeholder and always returns [`PLACEHOLDER_RSI`]; it is
/// computed and logged but does not take part in any trading decision.
pub fn relative_strength_index(_candles: &[Candle], _period: usize) -> f64 {
    PLACEHOLDER_RSI
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::candles_from_mids;

    #[test]
    fn placeholder_is_constant_and_in_range() {
        let rising = candles_from_mids(&[1.0, 2.0, 3.0]);
        let falling = candles_from_mids(&[3.0, 2.0, 1.0]);
        assert_eq!(relative_strength_index(&rising, 14), PLACEHOLDER_RSI);
        assert_eq!(relative_strength_index(&falling, 2), PLACEHOLDER_RSI);
        assert_eq!(relative_strength_index(&[], 0), PLACEHOLDER_RSI);
        assert!((0.0..=100.0).contains(&PLACEHOLDER_RSI));
    }
}
