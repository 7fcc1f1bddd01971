use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use common::{
    BrokerClient, Candle, Error, Instrument, InstrumentKind, OrderIntent, OrderResult, Position,
    PriceBar, Result,
};

const MARKET: &str = "MARKET";
const FILL_OR_KILL: &str = "FOK";
const DEFAULT_FILL: &str = "DEFAULT";
/// Request bid, ask and mid prices for every candle.
const CANDLE_PRICE_COMPONENTS: &str = "MBA";

/// OANDA v20 REST client bound to a single account.
pub struct OandaClient {
    account_id: String,
    api_key: String,
    base_url: Url,
    http: Client,
}

impl OandaClient {
    pub fn new(
        base_url: Url,
        api_key: impl Into<String>,
        account_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("OANDA base URL '{base_url}' cannot carry a path")));
        }
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            account_id: account_id.into(),
            api_key: api_key.into(),
            base_url,
            http,
        })
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let resp = self
            .http
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .header("Accept-Datetime-Format", "RFC3339")
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("GET {}: {e}", url.path())))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("GET {}: {e}", url.path())))?;

        if !status.is_success() {
            return Err(Error::Fetch(format!("GET {}: HTTP {status}: {body}", url.path())));
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Fetch(format!("GET {}: unexpected response: {e}", url.path())))
    }

    async fn post_json<B: Serialize>(&self, url: Url, body: &B) -> Result<(StatusCode, String)> {
        let resp = self
            .http
            .post(url.clone())
            .bearer_auth(&self.api_key)
            .header("Accept-Datetime-Format", "RFC3339")
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("POST {}: {e}", url.path())))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::Http(format!("POST {}: {e}", url.path())))?;
        Ok((status, text))
    }
}

#[async_trait]
impl BrokerClient for OandaClient {
    async fn account_instruments(&self) -> Result<Vec<Instrument>> {
        let url = self.endpoint(&["v3", "accounts", self.account_id.as_str(), "instruments"]);
        let resp: InstrumentsResponse = self.get_json(url).await?;
        Ok(resp.into_instruments())
    }

    async fn open_positions(&self) -> Result<Vec<Position>> {
        let url = self.endpoint(&["v3", "accounts", self.account_id.as_str(), "openTrades"]);
        let resp: TradesResponse = self.get_json(url).await?;
        resp.into_positions()
    }

    async fn candles(&self, instrument: &str, count: u32, granularity: &str) -> Result<Vec<Candle>> {
        let mut url = self.endpoint(&["v3", "instruments", instrument, "candles"]);
        url.query_pairs_mut()
            .append_pair("count", &count.to_string())
            .append_pair("granularity", granularity)
            .append_pair("price", CANDLE_PRICE_COMPONENTS);

        let resp: CandlesResponse = self.get_json(url).await?;
        resp.into_candles()
    }

    async fn submit_market_order(&self, order: &OrderIntent) -> Result<OrderResult> {
        let url = self.endpoint(&["v3", "accounts", self.account_id.as_str(), "orders"]);
        let payload = OrderRequest::market(order);

        debug!(
            instrument = %order.instrument,
            units = order.units,
            tp = %payload.order.take_profit_on_fill.price,
            sl = %payload.order.stop_loss_on_fill.price,
            "Submitting order to OANDA"
        );
        let (status, body) = self.post_json(url, &payload).await?;
        parse_order_response(order, status, &body)
    }
}

/// Fixed-point rendering of a price at the instrument's precision.
fn format_price(price: f64, precision: u32) -> String {
    format!("{:.*}", precision as usize, price)
}

fn parse_price(raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::Fetch(format!("invalid price '{raw}'")))
}

fn parse_order_response(order: &OrderIntent, status: StatusCode, body: &str) -> Result<OrderResult> {
    let rejected = |reason: String| Error::OrderRejected {
        instrument: order.instrument.clone(),
        reason,
    };

    let resp: OrderResponse = match serde_json::from_str(body) {
        Ok(resp) => resp,
        Err(_) if !status.is_success() => return Err(rejected(format!("HTTP {status}: {body}"))),
        Err(e) => return Err(Error::Json(e)),
    };

    if let Some(reject) = resp.order_reject_transaction {
        let reason = reject
            .reject_reason
            .or(resp.error_message)
            .unwrap_or_else(|| format!("HTTP {status}"));
        return Err(rejected(reason));
    }
    if let Some(cancel) = resp.order_cancel_transaction {
        return Err(rejected(format!("cancelled: {}", cancel.reason)));
    }
    if !status.is_success() {
        let reason = resp.error_message.unwrap_or_else(|| format!("HTTP {status}"));
        return Err(rejected(reason));
    }

    let (order_id, fill_price, timestamp) = match (resp.order_fill_transaction, resp.order_create_transaction) {
        (Some(fill), _) => {
            let price = fill.price.as_deref().map(parse_price).transpose()?;
            (fill.id, price, fill.time.unwrap_or_else(Utc::now))
        }
        (None, Some(create)) => (create.id, None, create.time.unwrap_or_else(Utc::now)),
        (None, None) => return Err(Error::Other(format!("order response without a transaction: {body}"))),
    };

    Ok(OrderResult {
        order_id,
        instrument: order.instrument.clone(),
        units: order.units,
        fill_price,
        timestamp,
    })
}

// ─── Request types ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OrderRequest<'a> {
    order: MarketOrderBody<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MarketOrderBody<'a> {
    #[serde(rename = "type")]
    order_type: &'static str,
    instrument: &'a str,
    units: String,
    time_in_force: &'static str,
    position_fill: &'static str,
    take_profit_on_fill: PriceDetails,
    stop_loss_on_fill: PriceDetails,
    client_extensions: ClientExtensions<'a>,
}

#[derive(Serialize)]
struct PriceDetails {
    price: String,
}

#[derive(Serialize)]
struct ClientExtensions<'a> {
    id: &'a str,
}

impl<'a> OrderRequest<'a> {
    fn market(order: &'a OrderIntent) -> Self {
        Self {
            order: MarketOrderBody {
                order_type: MARKET,
                instrument: &order.instrument,
                units: order.units.to_string(),
                time_in_force: FILL_OR_KILL,
                position_fill: DEFAULT_FILL,
                take_profit_on_fill: PriceDetails {
                    price: format_price(order.take_profit, order.price_precision),
                },
                stop_loss_on_fill: PriceDetails {
                    price: format_price(order.stop_loss, order.price_precision),
                },
                client_extensions: ClientExtensions { id: &order.client_id },
            },
        }
    }
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct InstrumentsResponse {
    instruments: Vec<InstrumentDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentDto {
    name: String,
    #[serde(rename = "type")]
    kind: InstrumentKind,
    display_precision: u32,
}

impl InstrumentsResponse {
    fn into_instruments(self) -> Vec<Instrument> {
        self.instruments
            .into_iter()
            .map(|i| Instrument {
                name: i.name,
                display_precision: i.display_precision,
                kind: i.kind,
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct TradesResponse {
    trades: Vec<TradeDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeDto {
    id: String,
    instrument: String,
    current_units: String,
    open_time: DateTime<Utc>,
}

impl TradesResponse {
    fn into_positions(self) -> Result<Vec<Position>> {
        self.trades
            .into_iter()
            .map(|t| {
                // Units arrive as a decimal string, e.g. "-100" or "100.0".
                let units = t
                    .current_units
                    .parse::<f64>()
                    .map_err(|_| Error::Fetch(format!("invalid units '{}'", t.current_units)))?;
                Ok(Position {
                    id: t.id,
                    instrument: t.instrument,
                    units: units as i64,
                    opened_at: t.open_time,
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct CandlesResponse {
    candles: Vec<CandleDto>,
}

#[derive(Deserialize)]
struct CandleDto {
    time: DateTime<Utc>,
    #[serde(default)]
    complete: bool,
    #[serde(default)]
    volume: u64,
    bid: Option<OhlcDto>,
    ask: Option<OhlcDto>,
    mid: Option<OhlcDto>,
}

#[derive(Deserialize)]
struct OhlcDto {
    o: String,
    h: String,
    l: String,
    c: String,
}

impl OhlcDto {
    fn to_bar(&self) -> Result<PriceBar> {
        Ok(PriceBar {
            open: parse_price(&self.o)?,
            high: parse_price(&self.h)?,
            low: parse_price(&self.l)?,
            close: parse_price(&self.c)?,
        })
    }
}

impl CandlesResponse {
    fn into_candles(self) -> Result<Vec<Candle>> {
        self.candles
            .into_iter()
            .map(|c| {
                let side = |bar: &Option<OhlcDto>, name: &str| -> Result<PriceBar> {
                    bar.as_ref()
                        .ok_or_else(|| Error::Fetch(format!("candle at {} has no {name} prices", c.time)))?
                        .to_bar()
                };
                Ok(Candle {
                    time: c.time,
                    complete: c.complete,
                    volume: c.volume,
                    bid: side(&c.bid, "bid")?,
                    ask: side(&c.ask, "ask")?,
                    mid: side(&c.mid, "mid")?,
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_create_transaction: Option<TransactionDto>,
    order_fill_transaction: Option<FillTransactionDto>,
    order_cancel_transaction: Option<CancelTransactionDto>,
    order_reject_transaction: Option<RejectTransactionDto>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct TransactionDto {
    id: String,
    time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct FillTransactionDto {
    id: String,
    price: Option<String>,
    time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct CancelTransactionDto {
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectTransactionDto {
    reject_reason: Option<String>,
}
