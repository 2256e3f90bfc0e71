/// RSI (Relative Strength Index) indicator.
///
/// Uses Wilder's smoothed moving average (same as TradingView / standard RSI).
/// Undefined until at least `period + 1` closed price values are available.
#[derive(Debug, Clone)]
pub struct RsiIndicator {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl RsiIndicator {
    pub fn new(period: usize, overbought: f64, oversold: f64) -> Self {
        assert!(period >= 2, "RSI period must be >= 2");
        Self { period, overbought, oversold }
    }

    /// RSI aligned by index to `closes` (oldest first). The first defined
    /// value sits at index `period`.
    pub fn series(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let mut out = vec![None; closes.len()];
        if closes.len() < self.period + 1 {
            return out;
        }

        // First average gain/loss over the initial `period` changes
        let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let initial = &changes[..self.period];

        let mut avg_gain = initial.iter().filter(|&&c| c > 0.0).sum::<f64>() / self.period as f64;
        let mut avg_loss = initial.iter().filter(|&&c| c < 0.0).map(|c| c.abs()).sum::<f64>()
            / self.period as f64;
        out[self.period] = Some(relative_strength(avg_gain, avg_loss));

        // Wilder smoothing over remaining changes; change i moves close i -> i + 1
        for (i, &change) in changes.iter().enumerate().skip(self.period) {
            let gain = if change > 0.0 { change } else { 0.0 };
            let loss = if change < 0.0 { change.abs() } else { 0.0 };
            avg_gain = (avg_gain * (self.period - 1) as f64 + gain) / self.period as f64;
            avg_loss = (avg_loss * (self.period - 1) as f64 + loss) / self.period as f64;
            out[i + 1] = Some(relative_strength(avg_gain, avg_loss));
        }
        out
    }

    /// RSI of the latest close.
    /// Returns `None` if there are fewer than `period + 1` values.
    pub fn compute(&self, closes: &[f64]) -> Option<f64> {
        self.series(closes).last().copied().flatten()
    }

    pub fn is_oversold(&self, value: f64) -> bool {
        value < self.oversold
    }

    pub fn is_overbought(&self, value: f64) -> bool {
        value > self.overbought
    }
}

fn relative_strength(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        // Flat window: no momentum either way
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let rsi = RsiIndicator::new(14, 70.0, 30.0);
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert!(rsi.compute(&prices).is_none());
    }

    #[test]
    fn rsi_returns_some_with_sufficient_data() {
        let rsi = RsiIndicator::new(14, 70.0, 30.0);
        // 15 values, exactly period+1
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert!(rsi.compute(&prices).is_some());
        let series = rsi.series(&prices);
        assert!(series[13].is_none());
        assert!(series[14].is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = RsiIndicator::new(3, 70.0, 30.0);
        // Strictly increasing prices → RSI = 100
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "Expected ~100, got {value}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = RsiIndicator::new(3, 70.0, 30.0);
        // Strictly decreasing prices → RSI = 0
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi.compute(&prices).unwrap();
        assert!((value - 0.0).abs() < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_flat_prices_is_neutral() {
        let rsi = RsiIndicator::new(3, 70.0, 30.0);
        let value = rsi.compute(&[10.0; 6]).unwrap();
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_wilder_smoothing_step() {
        // period 2: changes +2, -1 seed avg_gain 1.0, avg_loss 0.5 → RSI 66.67
        // next change +1: avg_gain 1.0, avg_loss 0.25 → RSI 80
        let rsi = RsiIndicator::new(2, 70.0, 30.0);
        let series = rsi.series(&[10.0, 12.0, 11.0, 12.0]);
        assert!((series[2].unwrap() - 200.0 / 3.0).abs() < 1e-9);
        assert!((series[3].unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_known_value() {
        // 14 changes: gains sum 3.14, losses sum 3.39
        let rsi = RsiIndicator::new(14, 70.0, 30.0);
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.15, 43.61, 44.33, 44.83, 45.10,
            45.15, 44.34, 44.09,
        ];
        let value = rsi.compute(&prices).unwrap();
        let expected = 100.0 - 100.0 / (1.0 + 3.14 / 3.39);
        assert!((value - expected).abs() < 1e-9, "RSI {value}, expected {expected}");
        assert!((value - 48.0858).abs() < 1e-4);
    }

    #[test]
    fn thresholds_are_strict() {
        let rsi = RsiIndicator::new(14, 70.0, 30.0);
        assert!(rsi.is_oversold(29.9));
        assert!(!rsi.is_oversold(30.0));
        assert!(rsi.is_overbought(70.1));
        assert!(!rsi.is_overbought(70.0));
    }
}
