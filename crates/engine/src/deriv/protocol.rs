use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::{Candle, Error, Order, OrderReceipt, Result, SettlementOutcome};

// ─── Requests ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AuthorizeRequest<'a> {
    pub authorize: &'a str,
}

#[derive(Serialize)]
pub struct TicksHistoryRequest<'a> {
    pub ticks_history: &'a str,
    pub adjust_start_time: u8,
    pub count: usize,
    pub end: &'a str,
    pub granularity: u32,
    pub style: &'a str,
}

impl<'a> TicksHistoryRequest<'a> {
    pub fn candles(instrument: &'a str, count: usize, granularity: u32) -> Self {
        Self {
            ticks_history: instrument,
            adjust_start_time: 1,
            count,
            end: "latest",
            granularity,
            style: "candles",
        }
    }
}

#[derive(Serialize)]
pub struct BuyRequest<'a> {
    pub buy: u8,
    /// Maximum price we accept to pay; equal to the stake.
    pub price: f64,
    pub parameters: ContractParameters<'a>,
    pub passthrough: Passthrough<'a>,
}

#[derive(Serialize)]
pub struct ContractParameters<'a> {
    pub amount: f64,
    pub basis: &'a str,
    pub contract_type: &'a str,
    pub currency: &'a str,
    pub duration: u32,
    pub duration_unit: &'a str,
    pub symbol: &'a str,
}

#[derive(Serialize)]
pub struct Passthrough<'a> {
    pub signal: &'a str,
    pub order_id: &'a str,
}

impl<'a> BuyRequest<'a> {
    pub fn for_order(order: &'a Order) -> Self {
        Self {
            buy: 1,
            price: order.stake,
            parameters: ContractParameters {
                amount: order.stake,
                basis: "stake",
                contract_type: order.direction.contract_type(),
                currency: &order.currency,
                duration: order.duration_minutes,
                duration_unit: "m",
                symbol: &order.instrument,
            },
            passthrough: Passthrough {
                signal: order.direction.contract_type(),
                order_id: &order.id,
            },
        }
    }
}

#[derive(Serialize)]
pub struct OpenContractRequest {
    pub proposal_open_contract: u8,
    pub contract_id: u64,
}

// ─── Responses ────────────────────────────────────────────────────────────────

/// Structured error carried in the `error` field of any reply.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// Codes that mean the credential itself is unusable.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.code.as_str(),
            "InvalidToken" | "AuthorizationRequired" | "InvalidAppID" | "PermissionDenied"
        )
    }

    fn describe(&self) -> String {
        if self.code.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.code)
        }
    }
}

/// Numbers arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Number {
    Float(f64),
    Text(String),
}

impl Number {
    fn value(&self) -> Option<f64> {
        let value = match self {
            Number::Float(v) => Some(*v),
            Number::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value.filter(|v| v.is_finite())
    }
}

#[derive(Deserialize)]
struct RawCandle {
    epoch: i64,
    open: Number,
    high: Number,
    low: Number,
    close: Number,
}

#[derive(Deserialize)]
struct CandlesReply {
    #[serde(default)]
    candles: Option<Vec<RawCandle>>,
}

#[derive(Deserialize)]
struct BuyReply {
    buy: BoughtContract,
}

#[derive(Deserialize)]
struct BoughtContract {
    contract_id: u64,
    #[serde(default)]
    buy_price: Option<Number>,
    #[serde(default)]
    purchase_time: Option<i64>,
}

#[derive(Deserialize)]
struct OpenContractReply {
    #[serde(default)]
    proposal_open_contract: Option<OpenContract>,
}

#[derive(Deserialize)]
struct OpenContract {
    #[serde(default)]
    profit: Option<Value>,
    #[serde(default)]
    is_sold: Option<u8>,
    #[serde(default)]
    status: Option<String>,
}

/// Extract the `error` object of a reply, if any.
pub fn api_error(reply: &Value) -> Option<ApiError> {
    let err = reply.get("error")?;
    Some(serde_json::from_value(err.clone()).unwrap_or_else(|_| ApiError {
        code: String::new(),
        message: err.to_string(),
    }))
}

/// Map a reply error for a call that needs no authorization.
fn feed_error(err: ApiError) -> Error {
    if err.is_auth_failure() {
        Error::AuthFailed(err.describe())
    } else {
        Error::DataUnavailable(err.describe())
    }
}

/// Map a reply error for an authorized trading call.
fn venue_error(err: ApiError) -> Error {
    if err.is_auth_failure() {
        Error::AuthFailed(err.describe())
    } else {
        Error::RejectedByVenue(err.describe())
    }
}

pub fn parse_authorize(reply: &Value) -> Result<()> {
    if let Some(err) = api_error(reply) {
        return Err(Error::AuthFailed(err.describe()));
    }
    if reply.get("authorize").map_or(true, Value::is_null) {
        return Err(Error::AuthFailed("authorize reply carried no account".into()));
    }
    Ok(())
}

pub fn parse_candles(reply: Value, granularity: u32) -> Result<Vec<Candle>> {
    if let Some(err) = api_error(&reply) {
        return Err(feed_error(err));
    }
    let parsed: CandlesReply =
        serde_json::from_value(reply).map_err(|e| Error::DataUnavailable(e.to_string()))?;
    let raw = parsed.candles.unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::DataUnavailable("No candles returned".into()));
    }

    raw.into_iter()
        .map(|c| -> Result<Candle> {
            let field = |n: &Number, name: &str| {
                n.value()
                    .ok_or_else(|| Error::DataUnavailable(format!("candle {name} is not numeric")))
            };
            Ok(Candle {
                open_time: epoch(c.epoch)
                    .ok_or_else(|| Error::DataUnavailable(format!("bad epoch {}", c.epoch)))?,
                open: field(&c.open, "open")?,
                high: field(&c.high, "high")?,
                low: field(&c.low, "low")?,
                close: field(&c.close, "close")?,
                interval_seconds: granularity,
            })
        })
        .collect()
}

pub fn parse_buy(reply: Value) -> Result<OrderReceipt> {
    if let Some(err) = api_error(&reply) {
        return Err(venue_error(err));
    }
    let parsed: BuyReply = serde_json::from_value(reply)
        .map_err(|e| Error::Protocol(format!("unexpected buy reply: {e}")))?;
    let bought = parsed.buy;

    Ok(OrderReceipt {
        contract_id: bought.contract_id.to_string(),
        accepted_at: bought.purchase_time.and_then(epoch).unwrap_or_else(Utc::now),
        buy_price: bought.buy_price.as_ref().and_then(Number::value),
    })
}

pub fn parse_settlement(contract_id: &str, reply: Value) -> Result<SettlementOutcome> {
    if let Some(err) = api_error(&reply) {
        return Err(venue_error(err));
    }
    let parsed: OpenContractReply = serde_json::from_value(reply)
        .map_err(|e| Error::Protocol(format!("unexpected contract reply: {e}")))?;

    let Some(contract) = parsed.proposal_open_contract else {
        return Ok(SettlementOutcome {
            contract_id: contract_id.to_string(),
            profit: None,
            is_final: false,
        });
    };

    let profit = contract.profit.as_ref().and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });
    let is_final = contract.is_sold == Some(1)
        || matches!(contract.status.as_deref(), Some("won" | "lost" | "sold"));

    Ok(SettlementOutcome {
        contract_id: contract_id.to_string(),
        profit,
        is_final,
    })
}

fn epoch(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use common::{Direction, Verdict};

    use super::*;

    #[test]
    fn ticks_history_request_shape() {
        let req = serde_json::to_value(TicksHistoryRequest::candles("R_50", 50, 60)).unwrap();
        assert_eq!(
            req,
            json!({
                "ticks_history": "R_50",
                "adjust_start_time": 1,
                "count": 50,
                "end": "latest",
                "granularity": 60,
                "style": "candles"
            })
        );
    }

    #[test]
    fn buy_request_carries_contract_parameters() {
        let order = Order::new("R_100", Direction::Sell, 0.35, "USD", 1);
        let req = serde_json::to_value(BuyRequest::for_order(&order)).unwrap();
        assert_eq!(req["buy"], 1);
        assert_eq!(req["price"], 0.35);
        assert_eq!(req["parameters"]["amount"], 0.35);
        assert_eq!(req["parameters"]["basis"], "stake");
        assert_eq!(req["parameters"]["contract_type"], "PUT");
        assert_eq!(req["parameters"]["currency"], "USD");
        assert_eq!(req["parameters"]["duration"], 1);
        assert_eq!(req["parameters"]["duration_unit"], "m");
        assert_eq!(req["parameters"]["symbol"], "R_100");
        assert_eq!(req["passthrough"]["signal"], "PUT");
    }

    #[test]
    fn parses_numeric_and_string_candles() {
        let reply = json!({
            "msg_type": "candles",
            "candles": [
                {"epoch": 1_700_000_000, "open": 10.5, "high": 11.0, "low": 10.0, "close": 10.75},
                {"epoch": 1_700_000_060, "open": "10.75", "high": "12", "low": "10.5", "close": "11.5"}
            ]
        });
        let candles = parse_candles(reply, 60).unwrap();
        assert_eq!(candles.len(), 2);
        assert!((candles[0].close - 10.75).abs() < 1e-12);
        assert!((candles[1].high - 12.0).abs() < 1e-12);
        assert_eq!(candles[1].interval_seconds, 60);
        assert!(candles[0].open_time < candles[1].open_time);
    }

    #[test]
    fn empty_or_missing_candles_are_data_unavailable() {
        assert!(matches!(
            parse_candles(json!({"candles": []}), 60),
            Err(Error::DataUnavailable(_))
        ));
        assert!(matches!(
            parse_candles(json!({"msg_type": "candles"}), 60),
            Err(Error::DataUnavailable(_))
        ));
        assert!(matches!(
            parse_candles(json!({"candles": [{"epoch": 1, "open": "x", "high": 1, "low": 1, "close": 1}]}), 60),
            Err(Error::DataUnavailable(_))
        ));
    }

    #[test]
    fn feed_errors_map_to_data_unavailable() {
        let reply = json!({"error": {"code": "MarketIsClosed", "message": "This market is presently closed."}});
        match parse_candles(reply, 60) {
            Err(Error::DataUnavailable(msg)) => assert!(msg.contains("presently closed")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn authorize_rejection_is_auth_failure() {
        let reply = json!({"error": {"code": "InvalidToken", "message": "The token is invalid."}});
        assert!(matches!(parse_authorize(&reply), Err(Error::AuthFailed(_))));
        assert!(parse_authorize(&json!({"authorize": {"loginid": "VRTC1"}})).is_ok());
    }

    #[test]
    fn buy_reply_yields_receipt() {
        let reply = json!({
            "msg_type": "buy",
            "buy": {"contract_id": 254_117_040_108u64, "buy_price": 0.35, "purchase_time": 1_700_000_000}
        });
        let receipt = parse_buy(reply).unwrap();
        assert_eq!(receipt.contract_id, "254117040108");
        assert_eq!(receipt.buy_price, Some(0.35));
        assert_eq!(receipt.accepted_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn buy_errors_are_venue_rejections() {
        let reply = json!({"error": {"code": "InsufficientBalance", "message": "Your account balance is insufficient."}});
        assert!(matches!(parse_buy(reply), Err(Error::RejectedByVenue(_))));

        let reply = json!({"error": {"code": "AuthorizationRequired", "message": "Please log in."}});
        assert!(matches!(parse_buy(reply), Err(Error::AuthFailed(_))));

        assert!(matches!(parse_buy(json!({"buy": {}})), Err(Error::Protocol(_))));
    }

    #[test]
    fn settlement_reply_scoring() {
        let lost = json!({"proposal_open_contract": {"profit": -0.35, "is_sold": 1, "status": "lost"}});
        let outcome = parse_settlement("7", lost).unwrap();
        assert_eq!(outcome.verdict(), Verdict::Loss { profit: -0.35 });

        let won = json!({"proposal_open_contract": {"profit": "0.33", "status": "won"}});
        assert_eq!(
            parse_settlement("7", won).unwrap().verdict(),
            Verdict::Win { profit: 0.33 }
        );

        let open = json!({"proposal_open_contract": {"profit": 0.12, "is_sold": 0, "status": "open"}});
        assert_eq!(parse_settlement("7", open).unwrap().verdict(), Verdict::Ambiguous);

        let empty = json!({"msg_type": "proposal_open_contract"});
        assert_eq!(parse_settlement("7", empty).unwrap().verdict(), Verdict::Ambiguous);
    }
}
