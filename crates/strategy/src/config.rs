use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{BotParameters, Error, Result};

/// One configured bot: a name, the account it trades, and its parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BotDefinition {
    /// Human-readable name shown in logs.
    pub name: String,
    /// Broker account id the bot trades on.
    pub account: String,
    pub params: BotParameters,
}

/// All bot definitions for the process.
///
/// JSON files are a top-level array, as in `bots.json`:
/// ```json
/// [
///   { "name": "scalper", "account": "101-001-0000000-001",
///     "params": { "candleGranularity": "M1", "candleCount": "500", ... } }
/// ]
/// ```
///
/// TOML files use `[[bot]]` tables:
/// ```toml
/// [[bot]]
/// name = "scalper"
/// account = "101-001-0000000-001"
///
/// [bot.params]
/// candleGranularity = "M1"
/// candleCount = 500
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BotFileConfig {
    #[serde(rename = "bot")]
    pub bots: Vec<BotDefinition>,
}

impl BotFileConfig {
    /// Load from a `.json` or `.toml` file, chosen by extension.
    /// Anything other than `.toml` is read as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read bot config at '{}': {e}", path.display()))
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        let cfg = if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
        .map_err(|e| Error::Config(format!("Bot config at '{}': {e}", path.display())))?;

        Ok(cfg)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let bots: Vec<BotDefinition> = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        Self { bots }.validated()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        cfg.validated()
    }

    fn validated(self) -> Result<Self> {
        if self.bots.is_empty() {
            return Err(Error::Config("no bot definitions found".into()));
        }
        for bot in &self.bots {
            if bot.name.trim().is_empty() {
                return Err(Error::Config("bot definition without a name".into()));
            }
            if bot.account.trim().is_empty() {
                return Err(Error::Config(format!("bot '{}' has no account", bot.name)));
            }
            if bot.params.sma_period == 0 {
                return Err(Error::Config(format!("bot '{}': SMAPeriod must be positive", bot.name)));
            }
            if bot.params.momentum_period < 2 {
                return Err(Error::Config(format!(
                    "bot '{}': momentumPeriod must be at least 2",
                    bot.name
                )));
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"[
        {
            "name": "scalper",
            "account": "101-001-1234567-001",
            "params": {
                "candleGranularity": "M1",
                "candleCount": "500",
                "momentumPeriod": 20,
                "SMAPeriod": 50,
                "rsiPeriod": 14,
                "stDevPeriod": 20,
                "volumeFactor": 1000,
                "takeProfitFactor": 0.002,
                "stopLossFactor": 0.001
            }
        },
        {
            "name": "swing",
            "account": "101-001-1234567-002",
            "params": {
                "candleGranularity": "H1",
                "candleCount": 200,
                "momentumPeriod": 10,
                "SMAPeriod": 24,
                "volumeFactor": 500,
                "takeProfitFactor": 0.01,
                "stopLossFactor": 0.005
            }
        }
    ]"#;

    const TOML: &str = r#"
        [[bot]]
        name = "scalper"
        account = "101-001-1234567-001"

        [bot.params]
        candleGranularity = "M5"
        candleCount = 100
        momentumPeriod = 10
        SMAPeriod = 20
        volumeFactor = 1000.0
        takeProfitFactor = 0.002
        stopLossFactor = 0.001
    "#;

    #[test]
    fn loads_json_array() {
        let cfg = BotFileConfig::from_json_str(JSON).unwrap();
        assert_eq!(cfg.bots.len(), 2);
        assert_eq!(cfg.bots[0].name, "scalper");
        assert_eq!(cfg.bots[0].params.candle_count, 500);
        assert_eq!(cfg.bots[1].params.candle_granularity, "H1");
        assert_eq!(cfg.bots[1].params.rsi_period, 0);
    }

    #[test]
    fn loads_toml_tables() {
        let cfg = BotFileConfig::from_toml_str(TOML).unwrap();
        assert_eq!(cfg.bots.len(), 1);
        assert_eq!(cfg.bots[0].params.candle_granularity, "M5");
        assert_eq!(cfg.bots[0].params.sma_period, 20);
    }

    #[test]
    fn empty_definitions_are_config_error() {
        assert!(BotFileConfig::from_json_str("[]").unwrap_err().is_config());
    }

    #[test]
    fn missing_account_is_config_error() {
        let json = JSON.replace("101-001-1234567-002", " ");
        assert!(BotFileConfig::from_json_str(&json).unwrap_err().is_config());
    }

    #[test]
    fn zero_sma_period_is_config_error() {
        let json = JSON.replace("\"SMAPeriod\": 24", "\"SMAPeriod\": 0");
        let err = BotFileConfig::from_json_str(&json).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("swing"));
    }

    #[test]
    fn momentum_period_below_two_is_config_error() {
        let toml = TOML.replace("momentumPeriod = 10", "momentumPeriod = 1");
        assert!(BotFileConfig::from_toml_str(&toml).unwrap_err().is_config());
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = BotFileConfig::load("/definitely/not/here/bots.json").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = std::env::temp_dir();
        let json_path = dir.join(format!("fxbot-bots-{}.json", std::process::id()));
        let toml_path = dir.join(format!("fxbot-bots-{}.toml", std::process::id()));
        std::fs::write(&json_path, JSON).unwrap();
        std::fs::write(&toml_path, TOML).unwrap();

        assert_eq!(BotFileConfig::load(&json_path).unwrap().bots.len(), 2);
        assert_eq!(BotFileConfig::load(&toml_path).unwrap().bots.len(), 1);

        let _ = std::fs::remove_file(json_path);
        let _ = std::fs::remove_file(toml_path);
    }
}
