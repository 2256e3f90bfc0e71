use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use common::{Order, OrderGateway, OrderReceipt, Result, SettlementOutcome};

/// Drives a single order through placement and settlement.
///
/// This is the ONLY component that calls `OrderGateway`.
pub struct OrderExecutor {
    gateway: Arc<dyn OrderGateway>,
    settlement_wait: Duration,
}

impl OrderExecutor {
    pub fn new(gateway: Arc<dyn OrderGateway>, settlement_wait: Duration) -> Self {
        Self {
            gateway,
            settlement_wait,
        }
    }

    pub async fn place(&self, order: &Order) -> Result<OrderReceipt> {
        info!(
            order_id = %order.id,
            instrument = %order.instrument,
            direction = %order.direction,
            stake = order.stake,
            duration_minutes = order.duration_minutes,
            "Placing order"
        );

        match self.gateway.place_order(order).await {
            Ok(receipt) => {
                info!(
                    order_id = %order.id,
                    contract_id = %receipt.contract_id,
                    buy_price = ?receipt.buy_price,
                    "Order accepted"
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(order_id = %order.id, instrument = %order.instrument, error = %e, "Order placement failed");
                Err(e)
            }
        }
    }

    /// Wait out the contract, then query its outcome exactly once.
    ///
    /// A failed query is reported as a non-final outcome so the contract is
    /// still scored; only fatal errors are returned.
    pub async fn settle(&self, receipt: &OrderReceipt) -> Result<SettlementOutcome> {
        info!(
            contract_id = %receipt.contract_id,
            wait = ?self.settlement_wait,
            "Awaiting settlement"
        );
        tokio::time::sleep(self.settlement_wait).await;

        match self.gateway.fetch_settlement(&receipt.contract_id).await {
            Ok(outcome) => {
                info!(
                    contract_id = %outcome.contract_id,
                    profit = ?outcome.profit,
                    is_final = outcome.is_final,
                    "Settlement fetched"
                );
                Ok(outcome)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(contract_id = %receipt.contract_id, error = %e, "Settlement query failed");
                Ok(SettlementOutcome {
                    contract_id: receipt.contract_id.clone(),
                    profit: None,
                    is_final: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use common::{Direction, Error, Verdict};

    use super::*;

    /// Gateway whose settlement answer is fixed at construction.
    struct FixedGateway {
        settlement: Mutex<Option<Result<SettlementOutcome>>>,
    }

    #[async_trait]
    impl OrderGateway for FixedGateway {
        async fn place_order(&self, _order: &Order) -> Result<OrderReceipt> {
            Ok(OrderReceipt {
                contract_id: "c-1".into(),
                accepted_at: Utc::now(),
                buy_price: Some(0.35),
            })
        }

        async fn fetch_settlement(&self, contract_id: &str) -> Result<SettlementOutcome> {
            self.settlement
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(Error::RejectedByVenue(format!("{contract_id} already settled"))))
        }
    }

    fn executor(settlement: Result<SettlementOutcome>) -> OrderExecutor {
        let gateway = FixedGateway {
            settlement: Mutex::new(Some(settlement)),
        };
        OrderExecutor::new(Arc::new(gateway), Duration::ZERO)
    }

    async fn place_and_settle(exec: &OrderExecutor) -> Result<SettlementOutcome> {
        let order = Order::new("R_50", Direction::Buy, 0.35, "USD", 1);
        let receipt = exec.place(&order).await.unwrap();
        exec.settle(&receipt).await
    }

    #[tokio::test]
    async fn settled_outcome_is_passed_through() {
        let exec = executor(Ok(SettlementOutcome {
            contract_id: "c-1".into(),
            profit: Some(0.33),
            is_final: true,
        }));
        let outcome = place_and_settle(&exec).await.unwrap();
        assert_eq!(outcome.verdict(), Verdict::Win { profit: 0.33 });
    }

    #[tokio::test]
    async fn failed_query_becomes_ambiguous() {
        let exec = executor(Err(Error::Transport("reset by peer".into())));
        let outcome = place_and_settle(&exec).await.unwrap();
        assert_eq!(outcome.contract_id, "c-1");
        assert_eq!(outcome.verdict(), Verdict::Ambiguous);
    }

    #[tokio::test]
    async fn auth_failure_is_returned() {
        let exec = executor(Err(Error::AuthFailed("token revoked".into())));
        assert!(matches!(
            place_and_settle(&exec).await,
            Err(Error::AuthFailed(_))
        ));
    }
}
