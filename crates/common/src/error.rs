use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad granularity code, missing bot definitions, invalid env values.
    /// Fatal for whatever was being configured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Instrument, position or candle fetch failed (including timeouts).
    /// The affected instrument or cycle is skipped.
    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Order rejected on {instrument}: {reason}")]
    OrderRejected { instrument: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
