use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Broker classification of a tradable instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstrumentKind {
    Currency,
    Cfd,
    Metal,
    #[serde(other)]
    Other,
}

/// A tradable instrument as listed for an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Broker symbol, e.g. "EUR_USD".
    pub name: String,
    /// Number of decimal places the broker accepts for prices.
    pub display_precision: u32,
    pub kind: InstrumentKind,
}

impl Instrument {
    pub fn currency(name: impl Into<String>, display_precision: u32) -> Self {
        Self {
            name: name.into(),
            display_precision,
            kind: InstrumentKind::Currency,
        }
    }
}

/// Open/high/low/close of one price side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    /// A flat bar where every field equals `price`.
    pub fn flat(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }
}

/// A fixed-interval price summary with bid, ask and mid sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    /// False while the candle's interval is still open.
    pub complete: bool,
    pub volume: u64,
    pub bid: PriceBar,
    pub ask: PriceBar,
    pub mid: PriceBar,
}

/// An open trade held on an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub instrument: String,
    /// Signed units: positive is long, negative is short.
    pub units: i64,
    pub opened_at: DateTime<Utc>,
}

/// Directional output of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Long,
    Short,
    Neutral,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Long => write!(f, "long"),
            Signal::Short => write!(f, "short"),
            Signal::Neutral => write!(f, "neutral"),
        }
    }
}

/// A sized market order with attached take-profit and stop-loss, ready for
/// submission. Built and consumed within a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    /// Client-side tag sent with the order.
    pub client_id: String,
    pub instrument: String,
    /// Signed units: positive buys, negative sells.
    pub units: i64,
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Decimal places used when the prices are sent to the broker.
    pub price_precision: u32,
}

impl OrderIntent {
    pub fn market(
        instrument: impl Into<String>,
        units: i64,
        take_profit: f64,
        stop_loss: f64,
        price_precision: u32,
    ) -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            instrument: instrument.into(),
            units,
            take_profit,
            stop_loss,
            price_precision,
        }
    }

    pub fn signal(&self) -> Signal {
        match self.units {
            u if u > 0 => Signal::Long,
            u if u < 0 => Signal::Short,
            _ => Signal::Neutral,
        }
    }
}

/// Broker confirmation of an accepted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub instrument: String,
    pub units: i64,
    /// `None` when the broker accepted the order without reporting a fill.
    pub fill_price: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Per-bot strategy and risk parameters, loaded once at startup.
///
/// Field names on the wire match the `bots.json` format:
/// ```json
/// {
///   "candleGranularity": "M1",
///   "candleCount": "500",
///   "momentumPeriod": 20,
///   "SMAPeriod": 50,
///   "rsiPeriod": 14,
///   "stDevPeriod": 20,
///   "volumeFactor": 1000,
///   "takeProfitFactor": 0.002,
///   "stopLossFactor": 0.001
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotParameters {
    #[serde(rename = "candleGranularity")]
    pub candle_granularity: String,
    #[serde(rename = "candleCount", deserialize_with = "number_or_string")]
    pub candle_count: u32,
    #[serde(rename = "momentumPeriod")]
    pub momentum_period: usize,
    #[serde(rename = "SMAPeriod")]
    pub sma_period: usize,
    /// Carried for the RSI stage, which is currently a placeholder.
    #[serde(rename = "rsiPeriod", default)]
    pub rsi_period: usize,
    /// Carried for the standard deviation stage, which is currently a placeholder.
    #[serde(rename = "stDevPeriod", default)]
    pub stdev_period: usize,
    #[serde(rename = "volumeFactor")]
    pub volume_factor: f64,
    #[serde(rename = "takeProfitFactor")]
    pub take_profit_factor: f64,
    #[serde(rename = "stopLossFactor")]
    pub stop_loss_factor: f64,
}

/// `bots.json` historically stores the candle count as a string.
fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid candle count '{s}'"))),
    }
}

/// Which broker environment the process trades against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    /// Real money.
    Live,
    /// Broker demo account.
    Practice,
    /// Practice market data, orders simulated in memory.
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Practice => write!(f, "practice"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Where a bot currently is in its polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BotState {
    #[default]
    Idle,
    Filtering,
    Evaluating,
    Waiting,
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotState::Idle => write!(f, "idle"),
            BotState::Filtering => write!(f, "filtering"),
            BotState::Evaluating => write!(f, "evaluating"),
            BotState::Waiting => write!(f, "waiting"),
        }
    }
}
