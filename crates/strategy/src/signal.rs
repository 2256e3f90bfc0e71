use tracing::debug;

use common::{Candle, Signal};

use crate::config::SignalParams;
use crate::indicators::{EmaIndicator, RsiIndicator};
use crate::Strategy;

/// Indicator values aligned by index to the candle closes.
/// `None` marks positions still inside an indicator's warm-up window.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub fast_ema: Vec<Option<f64>>,
    pub slow_ema: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
}

/// One fully defined row of an [`IndicatorSeries`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRow {
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub rsi: f64,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.fast_ema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fast_ema.is_empty()
    }

    /// The row at `index`, if every indicator is defined there.
    pub fn row(&self, index: usize) -> Option<IndicatorRow> {
        Some(IndicatorRow {
            fast_ema: (*self.fast_ema.get(index)?)?,
            slow_ema: (*self.slow_ema.get(index)?)?,
            rsi: (*self.rsi.get(index)?)?,
        })
    }

    /// The last two rows as `(prev, latest)`.
    pub fn last_two(&self) -> Option<(IndicatorRow, IndicatorRow)> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        Some((self.row(n - 2)?, self.row(n - 1)?))
    }
}

/// EMA crossover confirmed by RSI.
///
/// Buys on an upward fast/slow crossover while RSI is oversold, sells on a
/// downward crossover while RSI is overbought.
#[derive(Debug, Clone)]
pub struct EmaRsiStrategy {
    name: String,
    fast: EmaIndicator,
    slow: EmaIndicator,
    rsi: RsiIndicator,
}

impl EmaRsiStrategy {
    pub fn new(params: &SignalParams) -> Self {
        Self {
            name: format!(
                "EMA{}/{} RSI{}",
                params.fast_period, params.slow_period, params.rsi_period
            ),
            fast: EmaIndicator::new(params.fast_period),
            slow: EmaIndicator::new(params.slow_period),
            rsi: RsiIndicator::new(params.rsi_period, params.overbought, params.oversold),
        }
    }

    /// Minimum window for which both the previous and latest rows are defined.
    pub fn min_candles(&self) -> usize {
        self.fast
            .period
            .max(self.slow.period)
            .max(self.rsi.period + 1)
            + 1
    }

    pub fn indicators(&self, candles: &[Candle]) -> IndicatorSeries {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        IndicatorSeries {
            fast_ema: self.fast.series(&closes),
            slow_ema: self.slow.series(&closes),
            rsi: self.rsi.series(&closes),
        }
    }

    /// Apply the crossover rule to two consecutive rows.
    pub fn decide(&self, prev: &IndicatorRow, latest: &IndicatorRow) -> Signal {
        let crossed_up = prev.fast_ema < prev.slow_ema && latest.fast_ema > latest.slow_ema;
        let crossed_down = prev.fast_ema > prev.slow_ema && latest.fast_ema < latest.slow_ema;

        if crossed_up && self.rsi.is_oversold(latest.rsi) {
            Signal::Buy
        } else if crossed_down && self.rsi.is_overbought(latest.rsi) {
            Signal::Sell
        } else {
            Signal::None
        }
    }
}

impl Default for EmaRsiStrategy {
    fn default() -> Self {
        Self::new(&SignalParams::default())
    }
}

impl Strategy for EmaRsiStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, candles: &[Candle]) -> Signal {
        let Some((prev, latest)) = self.indicators(candles).last_two() else {
            debug!(
                candles = candles.len(),
                needed = self.min_candles(),
                "Indicators still warming up"
            );
            return Signal::None;
        };

        let signal = self.decide(&prev, &latest);
        debug!(
            fast = latest.fast_ema,
            slow = latest.slow_ema,
            rsi = latest.rsi,
            ?signal,
            "Evaluated candle window"
        );
        signal
    }
}
