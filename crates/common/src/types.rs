use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLC candle from the feed. Sequences are ordered oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub interval_seconds: u32,
}

/// Direction of a contract. `Buy` is a rise (CALL) contract, `Sell` a fall (PUT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    /// Contract type understood by the venue.
    pub fn contract_type(&self) -> &'static str {
        match self {
            Direction::Buy => "CALL",
            Direction::Sell => "PUT",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
        }
    }
}

/// Decision emitted by a strategy for one candle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    None,
}

impl Signal {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Signal::Buy => Some(Direction::Buy),
            Signal::Sell => Some(Direction::Sell),
            Signal::None => None,
        }
    }
}

/// A contract purchase to be submitted to the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Client-side identifier, used for log correlation only.
    pub id: String,
    pub instrument: String,
    pub direction: Direction,
    pub stake: f64,
    pub currency: String,
    pub duration_minutes: u32,
}

impl Order {
    pub fn new(
        instrument: impl Into<String>,
        direction: Direction,
        stake: f64,
        currency: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instrument: instrument.into(),
            direction,
            stake,
            currency: currency.into(),
            duration_minutes,
        }
    }
}

/// The venue's confirmation of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub contract_id: String,
    pub accepted_at: DateTime<Utc>,
    pub buy_price: Option<f64>,
}

/// Result of a settlement query for one contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementOutcome {
    pub contract_id: String,
    /// `None` when the venue did not report a usable profit figure.
    pub profit: Option<f64>,
    pub is_final: bool,
}

impl SettlementOutcome {
    /// Score the outcome. Anything that is not a final, positive profit is
    /// not a win; missing figures and open contracts are `Ambiguous`.
    pub fn verdict(&self) -> Verdict {
        match self.profit {
            Some(profit) if self.is_final && profit.is_finite() => {
                if profit > 0.0 {
                    Verdict::Win { profit }
                } else {
                    Verdict::Loss { profit }
                }
            }
            _ => Verdict::Ambiguous,
        }
    }
}

/// How a settled contract counts against the loss limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Win { profit: f64 },
    Loss { profit: f64 },
    /// Scored as a loss.
    Ambiguous,
}

impl Verdict {
    pub fn is_win(&self) -> bool {
        matches!(self, Verdict::Win { .. })
    }
}

/// Whether the bot is trading against the real venue or simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Current position of the trade controller's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    #[default]
    Scanning,
    Idle,
    SignalFound,
    OrderPlaced,
    AwaitingSettlement,
    Halted,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerState::Scanning => write!(f, "scanning"),
            ControllerState::Idle => write!(f, "idle"),
            ControllerState::SignalFound => write!(f, "signal_found"),
            ControllerState::OrderPlaced => write!(f, "order_placed"),
            ControllerState::AwaitingSettlement => write!(f, "awaiting_settlement"),
            ControllerState::Halted => write!(f, "halted"),
        }
    }
}

/// Events emitted by the trade controller. Each renders to the operator
/// message delivered through the notifier.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Started {
        mode: TradingMode,
        instruments: Vec<String>,
    },
    FetchFailed {
        instrument: String,
        error: String,
    },
    NoSignal {
        instrument: String,
    },
    SignalFound {
        instrument: String,
        direction: Direction,
    },
    OrderFailed {
        instrument: String,
        error: String,
    },
    OrderPlaced {
        instrument: String,
        direction: Direction,
        contract_id: String,
    },
    Won {
        instrument: String,
        profit: f64,
    },
    Lost {
        instrument: String,
        profit: f64,
    },
    Unsettled {
        instrument: String,
        contract_id: String,
    },
    Halted {
        consecutive_losses: u32,
    },
    Aborted {
        reason: String,
    },
    Fault {
        error: String,
    },
}

impl std::fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeEvent::Started { mode, instruments } => {
                write!(f, "🤖 Bot started ({mode}) on {}", instruments.join(", "))
            }
            TradeEvent::FetchFailed { instrument, error } => {
                write!(f, "⚠️ Failed to get candles for {instrument}: {error}")
            }
            TradeEvent::NoSignal { instrument } => write!(f, "📉 No signal for {instrument}"),
            TradeEvent::SignalFound {
                instrument,
                direction,
            } => write!(
                f,
                "📊 {instrument} Signal: {}. Placing trade...",
                direction.contract_type()
            ),
            TradeEvent::OrderFailed { instrument, error } => {
                write!(f, "❌ Error on {instrument}: {error}")
            }
            TradeEvent::OrderPlaced {
                instrument,
                direction,
                contract_id,
            } => write!(
                f,
                "✅ Trade Placed on {instrument}: {}, Contract ID: {contract_id}",
                direction.contract_type()
            ),
            TradeEvent::Won { instrument, profit } => {
                write!(f, "🎯 Win on {instrument}: +${profit:.2}")
            }
            TradeEvent::Lost { instrument, profit } => {
                write!(f, "🔻 Loss on {instrument}: ${profit:.2}")
            }
            TradeEvent::Unsettled {
                instrument,
                contract_id,
            } => write!(
                f,
                "🔻 Loss on {instrument}: contract {contract_id} did not report a settled profit"
            ),
            TradeEvent::Halted { consecutive_losses } => write!(
                f,
                "🚫 Bot paused after {consecutive_losses} consecutive losses (loss limit reached)."
            ),
            TradeEvent::Aborted { reason } => write!(f, "🛑 Bot stopped: {reason}"),
            TradeEvent::Fault { error } => write!(f, "⚠️ Bot Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(profit: Option<f64>, is_final: bool) -> SettlementOutcome {
        SettlementOutcome {
            contract_id: "1".into(),
            profit,
            is_final,
        }
    }

    #[test]
    fn positive_final_profit_is_a_win() {
        assert_eq!(
            outcome(Some(0.33), true).verdict(),
            Verdict::Win { profit: 0.33 }
        );
    }

    #[test]
    fn zero_or_negative_profit_is_a_loss() {
        assert_eq!(
            outcome(Some(0.0), true).verdict(),
            Verdict::Loss { profit: 0.0 }
        );
        assert_eq!(
            outcome(Some(-0.35), true).verdict(),
            Verdict::Loss { profit: -0.35 }
        );
    }

    #[test]
    fn missing_or_open_profit_is_ambiguous() {
        assert_eq!(outcome(None, true).verdict(), Verdict::Ambiguous);
        assert_eq!(outcome(Some(0.5), false).verdict(), Verdict::Ambiguous);
        assert_eq!(outcome(Some(f64::NAN), true).verdict(), Verdict::Ambiguous);
    }

    #[test]
    fn signal_maps_to_contract_direction() {
        assert_eq!(Signal::Buy.direction(), Some(Direction::Buy));
        assert_eq!(Signal::Sell.direction(), Some(Direction::Sell));
        assert_eq!(Signal::None.direction(), None);
        assert_eq!(Direction::Buy.contract_type(), "CALL");
        assert_eq!(Direction::Sell.contract_type(), "PUT");
    }

    #[test]
    fn order_ids_are_unique() {
        let a = Order::new("R_50", Direction::Buy, 0.35, "USD", 1);
        let b = Order::new("R_50", Direction::Buy, 0.35, "USD", 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn events_render_operator_messages() {
        let placed = TradeEvent::OrderPlaced {
            instrument: "R_50".into(),
            direction: Direction::Buy,
            contract_id: "42".into(),
        };
        assert_eq!(
            placed.to_string(),
            "✅ Trade Placed on R_50: CALL, Contract ID: 42"
        );
        let won = TradeEvent::Won {
            instrument: "R_10".into(),
            profit: 0.33,
        };
        assert_eq!(won.to_string(), "🎯 Win on R_10: +$0.33");
    }
}
