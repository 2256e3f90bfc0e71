use chrono::{DateTime, Utc};
use tracing::{info, warn};

use common::Verdict;

/// Consecutive-loss circuit breaker for one process lifetime.
///
/// The counter resets on a win and grows on every loss or ambiguous outcome.
/// Once it reaches `loss_limit` the session is halted for good; there is no
/// reset.
#[derive(Debug, Clone)]
pub struct TradingSession {
    loss_limit: u32,
    consecutive_losses: u32,
    halted_at: Option<DateTime<Utc>>,
}

/// Counter state after recording one outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUpdate {
    pub consecutive_losses: u32,
    /// True only for the outcome that tripped the limit.
    pub just_halted: bool,
}

impl TradingSession {
    pub fn new(loss_limit: u32) -> Self {
        assert!(loss_limit >= 1, "loss limit must be >= 1");
        Self {
            loss_limit,
            consecutive_losses: 0,
            halted_at: None,
        }
    }

    pub fn loss_limit(&self) -> u32 {
        self.loss_limit
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }

    pub fn halted_at(&self) -> Option<DateTime<Utc>> {
        self.halted_at
    }

    pub fn is_halted(&self) -> bool {
        self.halted_at.is_some()
    }

    /// Record a settled contract.
    pub fn record(&mut self, verdict: &Verdict) -> SessionUpdate {
        if self.is_halted() {
            warn!("Outcome recorded after the session halted; ignoring");
            return SessionUpdate {
                consecutive_losses: self.consecutive_losses,
                just_halted: false,
            };
        }

        if verdict.is_win() {
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
        }

        let just_halted = self.consecutive_losses >= self.loss_limit;
        if just_halted {
            self.halted_at = Some(Utc::now());
            warn!(
                consecutive_losses = self.consecutive_losses,
                loss_limit = self.loss_limit,
                "Loss limit reached, session halted"
            );
        } else {
            info!(
                consecutive_losses = self.consecutive_losses,
                loss_limit = self.loss_limit,
                "Session updated"
            );
        }

        SessionUpdate {
            consecutive_losses: self.consecutive_losses,
            just_halted,
        }
    }
}
