use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use common::{BrokerClient, Error, OrderIntent, OrderResult, Result};

/// Submits built orders to the broker.
///
/// This is the ONLY component that calls `BrokerClient::submit_market_order`.
/// A rejection is returned to the caller and never retried; the next cycle
/// re-evaluates the instrument from scratch.
pub struct OrderExecutor {
    broker: Arc<dyn BrokerClient>,
    timeout: Duration,
}

impl OrderExecutor {
    pub fn new(broker: Arc<dyn BrokerClient>, timeout: Duration) -> Self {
        Self { broker, timeout }
    }

    pub async fn submit(&self, order: &OrderIntent) -> Result<OrderResult> {
        info!(
            instrument = %order.instrument,
            units = order.units,
            tp = order.take_profit,
            sl = order.stop_loss,
            "Executing order"
        );

        let submitted = tokio::time::timeout(self.timeout, self.broker.submit_market_order(order))
            .await
            .map_err(|_| {
                Error::Fetch(format!(
                    "order submission for {} timed out after {:?}",
                    order.instrument, self.timeout
                ))
            })?;

        match submitted {
            Ok(result) => {
                info!(
                    instrument = %result.instrument,
                    order_id = %result.order_id,
                    price = ?result.fill_price,
                    units = result.units,
                    "Order filled"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(instrument = %order.instrument, error = %e, "Order submission failed");
                Err(e)
            }
        }
    }
}
