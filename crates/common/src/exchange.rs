use async_trait::async_trait;

use crate::{Candle, Order, OrderReceipt, Result, SettlementOutcome};

/// Remote feed of OHLC candles.
///
/// Implementations do not retry; a failed fetch is reported once and the
/// controller's polling cadence decides when to ask again.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Fetch the latest `count` candles for `instrument`, oldest first.
    async fn fetch_candles(
        &self,
        instrument: &str,
        count: usize,
        granularity_secs: u32,
    ) -> Result<Vec<Candle>>;
}

/// Abstraction over the venue's contract API.
///
/// `DerivClient` implements this for live trading.
/// `PaperGateway` implements this for simulation.
///
/// Only `OrderExecutor` in `crates/engine` should hold a reference to a
/// `dyn OrderGateway`.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Buy a contract and return the venue's receipt.
    async fn place_order(&self, order: &Order) -> Result<OrderReceipt>;

    /// Query the outcome of a contract. Only meaningful once the contract
    /// has expired; earlier calls may return a non-final outcome.
    async fn fetch_settlement(&self, contract_id: &str) -> Result<SettlementOutcome>;
}
