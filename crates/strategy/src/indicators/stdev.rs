use common::Candle;

/// Value reported by the standard deviation stage until a real one replaces it.
pub const PLACEHOLDER_STDEV: f64 = 2.0;

/// Standard deviation stage. Placeholder: always [`PLACEHOLDER_STDEV`].
pub fn standard_deviation(_candles: &[Candle], _period: usize) -> f64 {
    PLACEHOLDER_STDEV
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::candles_from_mids;

    #[test]
    fn placeholder_is_constant() {
        let volatile = candles_from_mids(&[1.0, 3.0, 0.5, 4.0]);
        let flat = candles_from_mids(&[2.0, 2.0, 2.0]);
        assert_eq!(standard_deviation(&volatile, 20), PLACEHOLDER_STDEV);
        assert_eq!(standard_deviation(&flat, 3), PLACEHOLDER_STDEV);
        assert_eq!(standard_deviation(&[], 0), PLACEHOLDER_STDEV);
    }
}
