use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Optional strategy parameter file (TOML).
///
/// Example `config/signal.toml`:
/// ```toml
/// [signal]
/// fast_period = 5
/// slow_period = 14
/// rsi_period = 14
/// oversold = 30.0
/// overbought = 70.0
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(default)]
    pub signal: SignalParams,
}

/// Parameters of the EMA crossover + RSI confirmation rule.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub rsi_period: usize,
    /// Buy confirmation: latest RSI strictly below this value.
    pub oversold: f64,
    /// Sell confirmation: latest RSI strictly above this value.
    pub overbought: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 14,
            rsi_period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<()> {
        if self.fast_period == 0 || self.fast_period >= self.slow_period {
            return Err(Error::Config(format!(
                "fast_period ({}) must be positive and below slow_period ({})",
                self.fast_period, self.slow_period
            )));
        }
        if self.rsi_period < 2 {
            return Err(Error::Config("rsi_period must be >= 2".into()));
        }
        if !(0.0..=100.0).contains(&self.oversold)
            || !(0.0..=100.0).contains(&self.overbought)
            || self.oversold >= self.overbought
        {
            return Err(Error::Config(format!(
                "RSI thresholds must satisfy 0 <= oversold ({}) < overbought ({}) <= 100",
                self.oversold, self.overbought
            )));
        }
        Ok(())
    }
}

impl StrategyFileConfig {
    /// Load and validate a parameter file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read strategy config at '{path}': {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid strategy config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.signal.validate()?;
        Ok(cfg)
    }
}
