use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{BrokerClient, Candle, Error, Instrument, OrderIntent, OrderResult, Position, Result};

/// Granularity used to look up the latest price for fills and marking.
const MARK_GRANULARITY: &str = "S5";

/// A simulated trade with the exit levels it was opened with.
#[derive(Debug, Clone)]
struct PaperTrade {
    position: Position,
    take_profit: f64,
    stop_loss: f64,
}

impl PaperTrade {
    /// Whether the latest candle crosses the take-profit or stop-loss.
    /// Longs exit on the bid, shorts on the ask.
    fn exit_hit(&self, latest: &Candle) -> bool {
        if self.position.units > 0 {
            let bid = latest.bid.close;
            bid >= self.take_profit || bid <= self.stop_loss
        } else {
            let ask = latest.ask.close;
            ask <= self.take_profit || ask >= self.stop_loss
        }
    }
}

/// Simulated broker for paper trading.
///
/// Instruments and candles come from a real market-data source; orders are
/// filled locally at the latest ask (buys) or bid (sells) with configurable
/// slippage. Nothing is ever sent to the broker's order endpoint.
pub struct PaperBroker {
    market: Arc<dyn BrokerClient>,
    /// Open simulated trades.
    trades: Arc<RwLock<Vec<PaperTrade>>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperBroker {
    pub fn new(market: Arc<dyn BrokerClient>, slippage_bps: f64) -> Self {
        info!(slippage_bps = slippage_bps, "PaperBroker initialized");
        Self {
            market,
            trades: Arc::new(RwLock::new(Vec::new())),
            slippage_bps,
        }
    }

    async fn latest_candle(&self, instrument: &str) -> Result<Candle> {
        self.market
            .candles(instrument, 1, MARK_GRANULARITY)
            .await?
            .pop()
            .ok_or_else(|| Error::Fetch(format!("no price available for {instrument}")))
    }

    /// Close every trade whose take-profit or stop-loss has been crossed.
    async fn mark_to_market(&self) {
        let open: Vec<PaperTrade> = self.trades.read().await.clone();
        let mut closed: Vec<String> = Vec::new();

        for trade in &open {
            let instrument = &trade.position.instrument;
            match self.latest_candle(instrument).await {
                Ok(latest) if trade.exit_hit(&latest) => {
                    info!(
                        instrument = %instrument,
                        units = trade.position.units,
                        bid = latest.bid.close,
                        ask = latest.ask.close,
                        "Paper trade closed at exit level"
                    );
                    closed.push(trade.position.id.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(instrument = %instrument, error = %e, "Could not mark paper trade, keeping it open");
                }
            }
        }

        if !closed.is_empty() {
            self.trades
                .write()
                .await
                .retain(|t| !closed.contains(&t.position.id));
        }
    }
}

#[async_trait]
impl BrokerClient for PaperBroker {
    async fn account_instruments(&self) -> Result<Vec<Instrument>> {
        self.market.account_instruments().await
    }

    async fn open_positions(&self) -> Result<Vec<Position>> {
        self.mark_to_market().await;
        Ok(self
            .trades
            .read()
            .await
            .iter()
            .map(|t| t.position.clone())
            .collect())
    }

    async fn candles(&self, instrument: &str, count: u32, granularity: &str) -> Result<Vec<Candle>> {
        self.market.candles(instrument, count, granularity).await
    }

    async fn submit_market_order(&self, order: &OrderIntent) -> Result<OrderResult> {
        if order.units == 0 {
            return Err(Error::OrderRejected {
                instrument: order.instrument.clone(),
                reason: "zero units".into(),
            });
        }
        let latest = self.latest_candle(&order.instrument).await?;

        // Apply slippage: buys pay more, sells receive less
        let slip = self.slippage_bps / 10_000.0;
        let fill_price = if order.units > 0 {
            latest.ask.close * (1.0 + slip)
        } else {
            latest.bid.close * (1.0 - slip)
        };

        debug!(
            instrument = %order.instrument,
            units = order.units,
            fill = fill_price,
            "Paper fill simulated"
        );

        let now = Utc::now();
        self.trades.write().await.push(PaperTrade {
            position: Position {
                id: order.client_id.clone(),
                instrument: order.instrument.clone(),
                units: order.units,
                opened_at: now,
            },
            take_profit: order.take_profit,
            stop_loss: order.stop_loss,
        });

        Ok(OrderResult {
            order_id: order.client_id.clone(),
            instrument: order.instrument.clone(),
            units: order.units,
            fill_price: Some(fill_price),
            timestamp: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use common::PriceBar;

    /// Market source whose latest price can be moved by the test.
    #[derive(Default)]
    struct MovableMarket {
        prices: Mutex<HashMap<String, (f64, f64)>>,
    }

    impl MovableMarket {
        fn set(&self, instrument: &str, bid: f64, ask: f64) {
            self.prices.lock().unwrap().insert(instrument.to_string(), (bid, ask));
        }
    }

    #[async_trait]
    impl BrokerClient for MovableMarket {
        async fn account_instruments(&self) -> Result<Vec<Instrument>> {
            Ok(vec![Instrument::currency("EUR_USD", 5)])
        }

        async fn open_positions(&self) -> Result<Vec<Position>> {
            Ok(Vec::new())
        }

        async fn candles(&self, instrument: &str, _count: u32, _granularity: &str) -> Result<Vec<Candle>> {
            let prices = self.prices.lock().unwrap();
            Ok(prices
                .get(instrument)
                .map(|&(bid, ask)| Candle {
                    time: Utc::now(),
                    complete: false,
                    volume: 1,
                    bid: PriceBar::flat(bid),
                    ask: PriceBar::flat(ask),
                    mid: PriceBar::flat((bid + ask) / 2.0),
                })
                .into_iter()
                .collect())
        }

        async fn submit_market_order(&self, _order: &OrderIntent) -> Result<OrderResult> {
            Err(Error::Other("market source does not take orders".into()))
        }
    }

    fn setup(slippage_bps: f64) -> (Arc<MovableMarket>, PaperBroker) {
        let market = Arc::new(MovableMarket::default());
        market.set("EUR_USD", 1.0, 1.0002);
        let broker = PaperBroker::new(market.clone(), slippage_bps);
        (market, broker)
    }

    #[tokio::test]
    async fn buy_fills_at_ask_with_positive_slippage() {
        let (_market, broker) = setup(10.0); // 10 bps
        let order = OrderIntent::market("EUR_USD", 100, 1.01, 0.99, 5);
        let fill = broker.submit_market_order(&order).await.unwrap();

        let expected = 1.0002 * (1.0 + 10.0 / 10_000.0);
        let price = fill.fill_price.unwrap();
        assert!((price - expected).abs() < 1e-9, "Buy fill price {price}, expected {expected}");
    }

    #[tokio::test]
    async fn sell_fills_at_bid_with_negative_slippage() {
        let (_market, broker) = setup(10.0);
        let order = OrderIntent::market("EUR_USD", -100, 0.99, 1.01, 5);
        let fill = broker.submit_market_order(&order).await.unwrap();

        let expected = 1.0 * (1.0 - 10.0 / 10_000.0);
        let price = fill.fill_price.unwrap();
        assert!((price - expected).abs() < 1e-9, "Sell fill price {price}, expected {expected}");
    }

    #[tokio::test]
    async fn position_recorded_after_fill() {
        let (_market, broker) = setup(0.0);
        let order = OrderIntent::market("EUR_USD", 100, 1.01, 0.99, 5);
        broker.submit_market_order(&order).await.unwrap();

        let positions = broker.open_positions().await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].instrument, "EUR_USD");
        assert_eq!(positions[0].units, 100);
    }

    #[tokio::test]
    async fn long_closes_on_take_profit() {
        let (market, broker) = setup(0.0);
        let order = OrderIntent::market("EUR_USD", 100, 1.01, 0.99, 5);
        broker.submit_market_order(&order).await.unwrap();

        market.set("EUR_USD", 1.005, 1.0052);
        assert_eq!(broker.open_positions().await.unwrap().len(), 1);

        market.set("EUR_USD", 1.011, 1.0112);
        assert!(broker.open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_closes_on_stop_loss() {
        let (market, broker) = setup(0.0);
        let order = OrderIntent::market("EUR_USD", -100, 0.99, 1.01, 5);
        broker.submit_market_order(&order).await.unwrap();

        market.set("EUR_USD", 1.0098, 1.0101);
        assert!(broker.open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unpriced_instrument_cannot_fill() {
        let (_market, broker) = setup(0.0);
        let order = OrderIntent::market("GBP_USD", 100, 1.3, 1.2, 5);
        let err = broker.submit_market_order(&order).await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
        assert!(broker.open_positions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn market_data_is_delegated() {
        let (_market, broker) = setup(0.0);
        assert_eq!(broker.account_instruments().await.unwrap().len(), 1);
        assert_eq!(broker.candles("EUR_USD", 500, "M1").await.unwrap().len(), 1);
    }
}
