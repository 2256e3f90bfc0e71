use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use common::{
    Candle, CandleSource, Error, Order, OrderGateway, OrderReceipt, Result, SettlementOutcome,
};

use super::protocol::{
    self, AuthorizeRequest, BuyRequest, OpenContractRequest, TicksHistoryRequest,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Connection {
    ws: WsStream,
    authorized: bool,
}

/// Client for the Deriv WebSocket API. Serves both the candle feed and
/// contract trading.
///
/// Holds one connection, opened lazily and authorized on first use by a
/// trading call. Any transport failure drops the connection; the next call
/// reconnects and authorizes again.
pub struct DerivClient {
    endpoint: Url,
    token: Option<String>,
    timeout: Duration,
    conn: Mutex<Option<Connection>>,
    next_req_id: AtomicU64,
}

impl DerivClient {
    pub fn new(ws_url: &str, app_id: u32, token: Option<String>, timeout: Duration) -> Result<Self> {
        let mut endpoint = Url::parse(ws_url)
            .map_err(|e| Error::Config(format!("invalid Deriv endpoint '{ws_url}': {e}")))?;
        endpoint
            .query_pairs_mut()
            .append_pair("app_id", &app_id.to_string());

        Ok(Self {
            endpoint,
            token,
            timeout,
            conn: Mutex::new(None),
            next_req_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn connect(&self) -> Result<Connection> {
        info!(host = ?self.endpoint.host_str(), "Connecting to Deriv WebSocket API");
        let (ws, _) = tokio::time::timeout(self.timeout, connect_async(self.endpoint.as_str()))
            .await
            .map_err(|_| Error::Transport("connect timed out".into()))?
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Connection {
            ws,
            authorized: false,
        })
    }

    /// Send one request on the shared connection and wait for its reply.
    async fn call<T: Serialize + Sync>(&self, request: &T, needs_auth: bool) -> Result<Value> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let Some(conn) = guard.as_mut() else {
            return Err(Error::Transport("connection unavailable".into()));
        };

        let result = self.call_on(conn, request, needs_auth).await;
        if matches!(result, Err(Error::Transport(_))) {
            warn!("Dropping Deriv connection after transport failure");
            *guard = None;
        }
        result
    }

    async fn call_on<T: Serialize + Sync>(
        &self,
        conn: &mut Connection,
        request: &T,
        needs_auth: bool,
    ) -> Result<Value> {
        if needs_auth && !conn.authorized {
            let token = self
                .token
                .as_deref()
                .ok_or_else(|| Error::AuthFailed("no Deriv API token configured".into()))?;
            let reply = self
                .round_trip(&mut conn.ws, &AuthorizeRequest { authorize: token })
                .await?;
            protocol::parse_authorize(&reply)?;
            conn.authorized = true;
            debug!("Deriv session authorized");
        }
        self.round_trip(&mut conn.ws, request).await
    }

    async fn round_trip<T: Serialize + Sync>(&self, ws: &mut WsStream, request: &T) -> Result<Value> {
        let req_id = self.next_req_id.fetch_add(1, Ordering::Relaxed);
        let mut payload = serde_json::to_value(request)?;
        if let Value::Object(map) = &mut payload {
            map.insert("req_id".into(), Value::from(req_id));
        }

        let exchange = async {
            ws.send(Message::Text(payload.to_string()))
                .await
                .map_err(|e| Error::Transport(e.to_string()))?;
            read_reply(ws, req_id).await
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                Error::Transport(format!(
                    "no reply to request {req_id} within {:?}",
                    self.timeout
                ))
            })?
    }
}

/// Read until the reply tagged with `req_id` arrives, skipping anything else.
async fn read_reply(ws: &mut WsStream, req_id: u64) -> Result<Value> {
    while let Some(msg) = ws.next().await {
        let msg = msg.map_err(|e| Error::Transport(e.to_string()))?;
        match msg {
            Message::Text(text) => {
                let reply: Value = serde_json::from_str(&text)?;
                if reply.get("req_id").and_then(Value::as_u64) == Some(req_id) {
                    return Ok(reply);
                }
                debug!(msg_type = ?reply.get("msg_type"), "Skipping unrelated message");
            }
            Message::Close(frame) => {
                return Err(Error::Transport(format!("connection closed: {frame:?}")));
            }
            _ => {} // pings are answered by tungstenite
        }
    }
    Err(Error::Transport("connection closed".into()))
}

#[async_trait]
impl CandleSource for DerivClient {
    async fn fetch_candles(
        &self,
        instrument: &str,
        count: usize,
        granularity_secs: u32,
    ) -> Result<Vec<Candle>> {
        let request = TicksHistoryRequest::candles(instrument, count, granularity_secs);
        let reply = self.call(&request, false).await?;
        let candles = protocol::parse_candles(reply, granularity_secs)?;
        debug!(instrument, count = candles.len(), "Fetched candles");
        Ok(candles)
    }
}

#[async_trait]
impl OrderGateway for DerivClient {
    async fn place_order(&self, order: &Order) -> Result<OrderReceipt> {
        debug!(
            instrument = %order.instrument,
            contract_type = order.direction.contract_type(),
            stake = order.stake,
            "Submitting buy to Deriv"
        );
        let request = BuyRequest::for_order(order);
        let reply = self.call(&request, true).await?;
        protocol::parse_buy(reply)
    }

    async fn fetch_settlement(&self, contract_id: &str) -> Result<SettlementOutcome> {
        let id: u64 = contract_id
            .parse()
            .map_err(|_| Error::RejectedByVenue(format!("invalid contract id '{contract_id}'")))?;
        let request = OpenContractRequest {
            proposal_open_contract: 1,
            contract_id: id,
        };
        let reply = self.call(&request, true).await?;
        protocol::parse_settlement(contract_id, reply)
    }
}
