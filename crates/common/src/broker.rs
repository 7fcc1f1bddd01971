use async_trait::async_trait;

use crate::{Candle, Instrument, OrderIntent, OrderResult, Position, Result};

/// Abstraction over one broker account connection.
///
/// `OandaClient` implements this against the v20 REST API.
/// `PaperBroker` implements this for simulation.
///
/// Each bot owns its own client; the account id is bound at construction.
/// Only `OrderExecutor` in `crates/engine` calls `submit_market_order`.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Instruments tradable on the bound account.
    async fn account_instruments(&self) -> Result<Vec<Instrument>>;

    /// Trades currently open on the bound account.
    async fn open_positions(&self) -> Result<Vec<Position>>;

    /// The most recent `count` candles for an instrument, oldest first,
    /// with bid, ask and mid prices.
    async fn candles(&self, instrument: &str, count: u32, granularity: &str) -> Result<Vec<Candle>>;

    /// Submit a market order with take-profit and stop-loss attached.
    async fn submit_market_order(&self, order: &OrderIntent) -> Result<OrderResult>;
}
