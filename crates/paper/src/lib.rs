use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use common::{
    CandleSource, Direction, Error, Order, OrderGateway, OrderReceipt, Result, SettlementOutcome,
};

/// Simulated order gateway for paper trading.
///
/// Contracts are priced off the live candle feed: the entry is the latest
/// close at placement, the exit is the latest close once the contract's
/// duration has elapsed. No real orders are ever sent to the venue.
pub struct PaperGateway {
    feed: Arc<dyn CandleSource>,
    /// Profit on a winning contract as a fraction of the stake.
    payout_ratio: f64,
    granularity_secs: u32,
    /// Open simulated contracts, keyed by contract ID.
    contracts: RwLock<HashMap<String, PaperContract>>,
}

#[derive(Debug)]
struct PaperContract {
    instrument: String,
    direction: Direction,
    stake: f64,
    entry_price: f64,
    expires_at: DateTime<Utc>,
}

impl PaperContract {
    /// Rising closes win a CALL, falling closes win a PUT; an unchanged
    /// price loses either way.
    fn profit(&self, exit_price: f64, payout_ratio: f64) -> f64 {
        let won = match self.direction {
            Direction::Buy => exit_price > self.entry_price,
            Direction::Sell => exit_price < self.entry_price,
        };
        if won {
            self.stake * payout_ratio
        } else {
            -self.stake
        }
    }
}

impl PaperGateway {
    pub fn new(feed: Arc<dyn CandleSource>, payout_ratio: f64, granularity_secs: u32) -> Self {
        info!(payout_ratio, granularity_secs, "PaperGateway initialized");
        Self {
            feed,
            payout_ratio,
            granularity_secs,
            contracts: RwLock::new(HashMap::new()),
        }
    }

    /// Number of simulated contracts not yet settled.
    pub async fn open_contracts(&self) -> usize {
        self.contracts.read().await.len()
    }

    async fn latest_close(&self, instrument: &str) -> Result<f64> {
        let candles = self
            .feed
            .fetch_candles(instrument, 1, self.granularity_secs)
            .await?;
        candles
            .last()
            .map(|c| c.close)
            .ok_or_else(|| Error::DataUnavailable(format!("no price available for {instrument}")))
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn place_order(&self, order: &Order) -> Result<OrderReceipt> {
        let entry_price = self.latest_close(&order.instrument).await?;
        let contract_id = uuid::Uuid::new_v4().simple().to_string();
        let accepted_at = Utc::now();

        let contract = PaperContract {
            instrument: order.instrument.clone(),
            direction: order.direction,
            stake: order.stake,
            entry_price,
            expires_at: accepted_at + Duration::minutes(i64::from(order.duration_minutes)),
        };
        debug!(
            contract_id = %contract_id,
            instrument = %contract.instrument,
            direction = %contract.direction,
            entry_price,
            "Paper contract opened"
        );
        self.contracts
            .write()
            .await
            .insert(contract_id.clone(), contract);

        Ok(OrderReceipt {
            contract_id,
            accepted_at,
            buy_price: Some(order.stake),
        })
    }

    async fn fetch_settlement(&self, contract_id: &str) -> Result<SettlementOutcome> {
        // A contract answers exactly one settlement query.
        let contract = self
            .contracts
            .write()
            .await
            .remove(contract_id)
            .ok_or_else(|| Error::RejectedByVenue(format!("unknown paper contract {contract_id}")))?;

        if Utc::now() < contract.expires_at {
            warn!(contract_id, expires_at = %contract.expires_at, "Paper contract queried before expiry");
            return Ok(SettlementOutcome {
                contract_id: contract_id.to_string(),
                profit: None,
                is_final: false,
            });
        }

        let exit_price = self.latest_close(&contract.instrument).await?;
        let profit = contract.profit(exit_price, self.payout_ratio);

        info!(
            contract_id,
            instrument = %contract.instrument,
            entry_price = contract.entry_price,
            exit_price,
            profit,
            "Paper contract settled"
        );

        Ok(SettlementOutcome {
            contract_id: contract_id.to_string(),
            profit: Some(profit),
            is_final: true,
        })
    }
}
