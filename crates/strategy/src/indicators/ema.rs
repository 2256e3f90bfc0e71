/// Exponential Moving Average.
///
/// Seeded with the simple average of the first `period` closes, then
/// `ema = close * k + ema_prev * (1 - k)` with `k = 2 / (period + 1)`.
/// Values inside the warm-up window (the first `period - 1` closes) are undefined.
#[derive(Debug, Clone)]
pub struct EmaIndicator {
    pub period: usize,
}

impl EmaIndicator {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self { period }
    }

    /// Smoothing factor `k`.
    pub fn smoothing(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }

    /// EMA aligned by index to `closes` (oldest first).
    pub fn series(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let mut out = vec![None; closes.len()];
        if closes.len() < self.period {
            return out;
        }

        let k = self.smoothing();
        let mut ema = closes[..self.period].iter().sum::<f64>() / self.period as f64;
        out[self.period - 1] = Some(ema);

        for (i, &close) in closes.iter().enumerate().skip(self.period) {
            ema = close * k + ema * (1.0 - k);
            out[i] = Some(ema);
        }
        out
    }

    /// EMA of the latest close, or `None` during warm-up.
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        self.series(closes).last().copied().flatten()
    }
}
