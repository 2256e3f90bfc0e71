use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use common::{
    CandleSource, Config, ControllerState, Error, Notifier, Order, OrderFailurePolicy,
    OrderGateway, Result, SettlementOutcome, TradeEvent, TradingMode, Verdict,
};
use risk::TradingSession;
use strategy::Strategy;

use crate::executor::OrderExecutor;

/// Settings the controller needs, split out of the process configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub mode: TradingMode,
    /// Scanned in this order every cycle.
    pub instruments: Vec<String>,
    pub candle_count: usize,
    pub granularity_secs: u32,
    pub stake: f64,
    pub currency: String,
    pub duration_minutes: u32,
    pub loss_limit: u32,
    pub failure_policy: OrderFailurePolicy,
    /// Pause after each instrument.
    pub poll_interval: Duration,
    pub settlement_wait: Duration,
    /// Pause after an unexpected error before scanning again.
    pub error_cooldown: Duration,
}

impl ControllerConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            mode: cfg.trading_mode,
            instruments: cfg.symbols.clone(),
            candle_count: cfg.candle_count,
            granularity_secs: cfg.granularity_secs,
            stake: cfg.stake,
            currency: cfg.currency.clone(),
            duration_minutes: cfg.duration_minutes,
            loss_limit: cfg.loss_limit,
            failure_policy: cfg.order_failure_policy,
            poll_interval: cfg.poll_interval,
            settlement_wait: cfg.settlement_wait,
            error_cooldown: cfg.error_cooldown,
        }
    }
}

/// Why the trading loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    LossLimitReached { consecutive_losses: u32 },
    AuthFailed(String),
    /// An order failed under `OrderFailurePolicy::Abort`.
    OrderFailed(String),
}

/// The trading loop: candles → signal → order → settlement → loss counter.
///
/// Instruments are handled strictly one after another, and an order is
/// always settled before the next signal is evaluated, so at most one
/// contract is outstanding at any time.
pub struct TradeController {
    cfg: ControllerConfig,
    feed: Arc<dyn CandleSource>,
    executor: OrderExecutor,
    strategy: Box<dyn Strategy>,
    notifier: Arc<dyn Notifier>,
    session: TradingSession,
    state: ControllerState,
}

impl TradeController {
    pub fn new(
        cfg: ControllerConfig,
        feed: Arc<dyn CandleSource>,
        gateway: Arc<dyn OrderGateway>,
        strategy: Box<dyn Strategy>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let executor = OrderExecutor::new(gateway, cfg.settlement_wait);
        let session = TradingSession::new(cfg.loss_limit);
        Self {
            cfg,
            feed,
            executor,
            strategy,
            notifier,
            session,
            state: ControllerState::Scanning,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn session(&self) -> &TradingSession {
        &self.session
    }

    /// Run until the loss limit trips or the run is aborted.
    /// Unexpected errors are reported and followed by the error cooldown.
    pub async fn run(mut self) -> RunOutcome {
        info!(
            mode = %self.cfg.mode,
            strategy = %self.strategy.name(),
            instruments = ?self.cfg.instruments,
            loss_limit = self.cfg.loss_limit,
            "Trade controller running"
        );
        self.emit(TradeEvent::Started {
            mode: self.cfg.mode,
            instruments: self.cfg.instruments.clone(),
        })
        .await;

        loop {
            match self.run_cycle().await {
                Ok(Some(outcome)) => {
                    info!(?outcome, "Trade controller stopped");
                    return outcome;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, cooldown = ?self.cfg.error_cooldown, "Trading loop error");
                    self.state = ControllerState::Scanning;
                    self.emit(TradeEvent::Fault {
                        error: e.to_string(),
                    })
                    .await;
                    tokio::time::sleep(self.cfg.error_cooldown).await;
                }
            }
        }
    }

    /// One pass over every configured instrument.
    /// Returns `Some` when the run must end.
    pub async fn run_cycle(&mut self) -> Result<Option<RunOutcome>> {
        if self.session.is_halted() {
            self.state = ControllerState::Halted;
            return Ok(Some(RunOutcome::LossLimitReached {
                consecutive_losses: self.session.consecutive_losses(),
            }));
        }

        let instruments = self.cfg.instruments.clone();
        for instrument in &instruments {
            if let Some(outcome) = self.scan_instrument(instrument).await? {
                return Ok(Some(outcome));
            }
            tokio::time::sleep(self.cfg.poll_interval).await;
        }
        Ok(None)
    }

    async fn scan_instrument(&mut self, instrument: &str) -> Result<Option<RunOutcome>> {
        self.state = ControllerState::Scanning;

        let candles = match self
            .feed
            .fetch_candles(instrument, self.cfg.candle_count, self.cfg.granularity_secs)
            .await
        {
            Ok(candles) => candles,
            Err(Error::AuthFailed(reason)) => {
                return Ok(Some(self.abort(RunOutcome::AuthFailed(reason)).await));
            }
            Err(e) => {
                warn!(instrument, error = %e, "Skipping instrument this cycle");
                self.emit(TradeEvent::FetchFailed {
                    instrument: instrument.to_string(),
                    error: e.to_string(),
                })
                .await;
                return Ok(None);
            }
        };

        let Some(direction) = self.strategy.evaluate(&candles).direction() else {
            self.state = ControllerState::Idle;
            self.emit(TradeEvent::NoSignal {
                instrument: instrument.to_string(),
            })
            .await;
            return Ok(None);
        };

        self.state = ControllerState::SignalFound;
        info!(instrument, %direction, "Signal found");
        self.emit(TradeEvent::SignalFound {
            instrument: instrument.to_string(),
            direction,
        })
        .await;

        let order = Order::new(
            instrument,
            direction,
            self.cfg.stake,
            self.cfg.currency.as_str(),
            self.cfg.duration_minutes,
        );
        let receipt = match self.executor.place(&order).await {
            Ok(receipt) => receipt,
            Err(e) => return self.handle_order_failure(instrument, e).await,
        };

        self.state = ControllerState::OrderPlaced;
        self.emit(TradeEvent::OrderPlaced {
            instrument: instrument.to_string(),
            direction,
            contract_id: receipt.contract_id.clone(),
        })
        .await;

        self.state = ControllerState::AwaitingSettlement;
        let outcome = match self.executor.settle(&receipt).await {
            Ok(outcome) => outcome,
            Err(Error::AuthFailed(reason)) => {
                return Ok(Some(self.abort(RunOutcome::AuthFailed(reason)).await));
            }
            Err(e) => return Err(e),
        };

        Ok(self.record_outcome(instrument, &outcome).await)
    }

    /// Every placement error is reported; fatal ones end the run, the rest
    /// follow the configured failure policy.
    async fn handle_order_failure(
        &mut self,
        instrument: &str,
        e: Error,
    ) -> Result<Option<RunOutcome>> {
        let outcome = match &e {
            Error::AuthFailed(reason) => Some(RunOutcome::AuthFailed(reason.clone())),
            _ => match self.cfg.failure_policy {
                OrderFailurePolicy::Skip => None,
                OrderFailurePolicy::Abort => Some(RunOutcome::OrderFailed(e.to_string())),
            },
        };

        self.state = ControllerState::Scanning;
        self.emit(TradeEvent::OrderFailed {
            instrument: instrument.to_string(),
            error: e.to_string(),
        })
        .await;

        match outcome {
            Some(outcome) => Ok(Some(self.abort(outcome).await)),
            None => Ok(None),
        }
    }

    /// Score a settled contract and trip the halt when the limit is reached.
    async fn record_outcome(
        &mut self,
        instrument: &str,
        outcome: &SettlementOutcome,
    ) -> Option<RunOutcome> {
        let verdict = outcome.verdict();
        let event = match verdict {
            Verdict::Win { profit } => TradeEvent::Won {
                instrument: instrument.to_string(),
                profit,
            },
            Verdict::Loss { profit } => TradeEvent::Lost {
                instrument: instrument.to_string(),
                profit,
            },
            Verdict::Ambiguous => TradeEvent::Unsettled {
                instrument: instrument.to_string(),
                contract_id: outcome.contract_id.clone(),
            },
        };
        self.emit(event).await;

        let update = self.session.record(&verdict);
        info!(
            instrument,
            ?verdict,
            consecutive_losses = update.consecutive_losses,
            "Contract settled"
        );

        if update.just_halted {
            self.state = ControllerState::Halted;
            self.emit(TradeEvent::Halted {
                consecutive_losses: update.consecutive_losses,
            })
            .await;
            return Some(RunOutcome::LossLimitReached {
                consecutive_losses: update.consecutive_losses,
            });
        }

        self.state = ControllerState::Scanning;
        None
    }

    async fn abort(&mut self, outcome: RunOutcome) -> RunOutcome {
        let reason = match &outcome {
            RunOutcome::AuthFailed(reason) => format!("authorization failed: {reason}"),
            RunOutcome::OrderFailed(reason) => format!("order failed: {reason}"),
            RunOutcome::LossLimitReached { consecutive_losses } => {
                format!("{consecutive_losses} consecutive losses")
            }
        };
        error!(%reason, "Trading run aborted");
        self.state = ControllerState::Halted;
        self.emit(TradeEvent::Aborted { reason }).await;
        outcome
    }

    async fn emit(&self, event: TradeEvent) {
        self.notifier.notify(&event.to_string()).await;
    }
}
