use std::time::Duration;

use url::Url;

use crate::{Error, Result, TradingMode};

const PRACTICE_URL: &str = "https://api-fxpractice.oanda.com";
const LIVE_URL: &str = "https://api-fxtrade.oanda.com";

/// All process configuration loaded from environment variables at startup.
/// Per-bot parameters live in the bot definitions file, not here.
#[derive(Debug, Clone)]
pub struct Config {
    // Broker
    pub trading_mode: TradingMode,
    pub oanda_api_key: String,
    pub oanda_base_url: Url,

    // Bots
    pub bots_config_path: String,
    pub currencies_only: bool,

    // Loop tuning
    pub request_timeout: Duration,
    pub max_concurrent_evaluations: usize,

    // Paper trading
    pub paper_slippage_bps: f64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let trading_mode = match lookup("TRADING_MODE")
            .unwrap_or_else(|| "practice".to_string())
            .to_lowercase()
            .as_str()
        {
            "practice" => TradingMode::Practice,
            "live" => TradingMode::Live,
            "paper" => TradingMode::Paper,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'practice', 'live' or 'paper', got: '{other}'"
                )))
            }
        };

        let oanda_api_key = lookup("OANDA_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "Required environment variable 'OANDA_API_KEY' is not set. Check your .env file."
                        .into(),
                )
            })?;

        // Paper mode still reads real candles, from the demo environment.
        let default_url = match trading_mode {
            TradingMode::Live => LIVE_URL,
            TradingMode::Practice | TradingMode::Paper => PRACTICE_URL,
        };
        let raw_url = lookup("OANDA_API_URL").unwrap_or_else(|| default_url.to_string());
        let oanda_base_url = Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("OANDA_API_URL '{raw_url}' is not a URL: {e}")))?;

        let request_timeout_secs: u64 = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 10)?;
        if request_timeout_secs == 0 {
            return Err(Error::Config("REQUEST_TIMEOUT_SECS must be positive".into()));
        }

        let max_concurrent_evaluations: usize = parse_or(&lookup, "MAX_CONCURRENT_EVALUATIONS", 16)?;
        if max_concurrent_evaluations == 0 {
            return Err(Error::Config(
                "MAX_CONCURRENT_EVALUATIONS must be positive".into(),
            ));
        }

        Ok(Config {
            trading_mode,
            oanda_api_key,
            oanda_base_url,
            bots_config_path: lookup("BOTS_CONFIG_PATH").unwrap_or_else(|| "bots.json".to_string()),
            currencies_only: parse_or(&lookup, "CURRENCIES_ONLY", true)?,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_concurrent_evaluations,
            paper_slippage_bps: parse_or(&lookup, "PAPER_SLIPPAGE_BPS", 0.0)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_practice() {
        let cfg = load(&[("OANDA_API_KEY", "secret")]).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Practice);
        assert_eq!(cfg.oanda_base_url.as_str(), "https://api-fxpractice.oanda.com/");
        assert_eq!(cfg.bots_config_path, "bots.json");
        assert!(cfg.currencies_only);
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_concurrent_evaluations, 16);
    }

    #[test]
    fn live_mode_uses_live_endpoint() {
        let cfg = load(&[("OANDA_API_KEY", "secret"), ("TRADING_MODE", "LIVE")]).unwrap();
        assert_eq!(cfg.trading_mode, TradingMode::Live);
        assert_eq!(cfg.oanda_base_url.host_str(), Some("api-fxtrade.oanda.com"));
    }

    #[test]
    fn missing_key_is_config_error() {
        assert!(load(&[]).unwrap_err().is_config());
        assert!(load(&[("OANDA_API_KEY", "  ")]).unwrap_err().is_config());
    }

    #[test]
    fn bad_values_are_config_errors() {
        let key = ("OANDA_API_KEY", "secret");
        assert!(load(&[key, ("TRADING_MODE", "yolo")]).is_err());
        assert!(load(&[key, ("REQUEST_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[key, ("MAX_CONCURRENT_EVALUATIONS", "many")]).is_err());
        assert!(load(&[key, ("CURRENCIES_ONLY", "maybe")]).is_err());
        assert!(load(&[key, ("OANDA_API_URL", "not a url")]).is_err());
    }
}
