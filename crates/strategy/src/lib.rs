pub mod config;
pub mod indicators;
pub mod signal;

pub use config::{SignalParams, StrategyFileConfig};
pub use signal::{EmaRsiStrategy, IndicatorRow, IndicatorSeries};

use common::{Candle, Signal};

/// All strategy implementations must satisfy this trait.
pub trait Strategy: Send + Sync {
    /// Human-readable name of this strategy instance.
    fn name(&self) -> &str;

    /// Evaluate a candle window (oldest first) and decide whether to trade.
    ///
    /// Must be a pure function of `candles`. Returns `Signal::None` when no
    /// actionable signal is present, including while indicators warm up.
    fn evaluate(&self, candles: &[Candle]) -> Signal;
}
