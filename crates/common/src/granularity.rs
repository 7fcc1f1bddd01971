use std::time::Duration;

use crate::{Error, Result};

/// Convert a candle granularity code into the time span one candle covers.
///
/// Codes are a unit prefix (`S`, `M`, `H`, `D`) followed by a positive
/// decimal multiplier: `"M5"` is five minutes, `"D2"` is 48 hours.
/// Anything else is a configuration error; there is no fallback interval.
pub fn granularity_to_duration(code: &str) -> Result<Duration> {
    let mut chars = code.chars();
    let unit = chars
        .next()
        .ok_or_else(|| Error::Config("empty candle granularity".into()))?;
    let digits = chars.as_str();

    let seconds_per_unit: u64 = match unit {
        'S' => 1,
        'M' => 60,
        'H' => 60 * 60,
        'D' => 24 * 60 * 60,
        _ => {
            return Err(Error::Config(format!(
                "unrecognised candle granularity '{code}'"
            )))
        }
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Config(format!(
            "candle granularity '{code}' needs a numeric multiplier"
        )));
    }
    let multiplier: u64 = digits
        .parse()
        .map_err(|_| Error::Config(format!("candle granularity '{code}' is out of range")))?;
    if multiplier == 0 {
        return Err(Error::Config(format!(
            "candle granularity '{code}' has a zero multiplier"
        )));
    }

    multiplier
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| Error::Config(format!("candle granularity '{code}' is out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(granularity_to_duration("S30").unwrap(), Duration::from_secs(30));
        assert_eq!(granularity_to_duration("M5").unwrap(), Duration::from_secs(5 * 60));
        assert_eq!(granularity_to_duration("H1").unwrap(), Duration::from_secs(60 * 60));
        assert_eq!(
            granularity_to_duration("D2").unwrap(),
            Duration::from_secs(48 * 60 * 60)
        );
    }

    #[test]
    fn multi_digit_multiplier() {
        assert_eq!(granularity_to_duration("M15").unwrap(), Duration::from_secs(15 * 60));
        assert_eq!(granularity_to_duration("H12").unwrap(), Duration::from_secs(12 * 3600));
    }

    #[test]
    fn unknown_prefix_is_config_error() {
        for code in ["W1", "m5", "X", "5M"] {
            let err = granularity_to_duration(code).unwrap_err();
            assert!(err.is_config(), "{code} should be a config error, got {err}");
        }
    }

    #[test]
    fn missing_or_bad_multiplier_is_config_error() {
        for code in ["", "M", "M-5", "M+5", "H1.5", "S 30", "M0"] {
            let err = granularity_to_duration(code).unwrap_err();
            assert!(err.is_config(), "{code:?} should be a config error, got {err}");
        }
    }

    #[test]
    fn overflowing_multiplier_is_config_error() {
        assert!(granularity_to_duration("D99999999999999999999").is_err());
        assert!(granularity_to_duration("D9999999999999999").is_err());
    }
}
