use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result, TradingMode};

/// What the controller does after the venue refuses an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderFailurePolicy {
    /// Report the failure and continue with the next instrument.
    #[default]
    Skip,
    /// Report the failure and stop the run.
    Abort,
}

impl FromStr for OrderFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(OrderFailurePolicy::Skip),
            "abort" => Ok(OrderFailurePolicy::Abort),
            other => Err(Error::Config(format!(
                "ORDER_FAILURE_POLICY must be 'skip' or 'abort', got: '{other}'"
            ))),
        }
    }
}

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub trading_mode: TradingMode,

    // Deriv
    pub deriv_token: Option<String>,
    pub deriv_app_id: u32,
    pub deriv_ws_url: String,

    // Telegram
    pub telegram_token: Option<String>,
    pub telegram_chat_ids: Vec<i64>,

    // Trading
    pub symbols: Vec<String>,
    pub stake: f64,
    pub currency: String,
    pub duration_minutes: u32,
    pub loss_limit: u32,
    pub candle_count: usize,
    pub granularity_secs: u32,
    pub order_failure_policy: OrderFailurePolicy,
    pub paper_payout_ratio: f64,

    // Timing
    pub poll_interval: Duration,
    pub settlement_wait: Duration,
    pub error_cooldown: Duration,
    pub request_timeout: Duration,

    // Strategy parameter file path
    pub strategy_config_path: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let trading_mode = match get("TRADING_MODE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'paper' or 'live', got: '{other}'"
                )))
            }
        };

        let deriv_token = get("DERIV_API_TOKEN");
        if trading_mode == TradingMode::Live && deriv_token.is_none() {
            return Err(Error::Config(
                "DERIV_API_TOKEN is required when TRADING_MODE=live".into(),
            ));
        }

        let telegram_chat_ids = match get("TELEGRAM_CHAT_ID") {
            Some(raw) => raw
                .split(',')
                .map(|s| {
                    s.trim().parse::<i64>().map_err(|_| {
                        Error::Config(format!(
                            "TELEGRAM_CHAT_ID contains non-numeric ID: '{}'",
                            s.trim()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        let symbols: Vec<String> = get("SYMBOLS")
            .unwrap_or_else(|| "R_50,R_100,R_25,R_75,R_10".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let cfg = Config {
            trading_mode,
            deriv_token,
            deriv_app_id: parse_or(&get, "DERIV_APP_ID", 1089)?,
            deriv_ws_url: get("DERIV_WS_URL")
                .unwrap_or_else(|| "wss://ws.deriv.com/websockets/v3".to_string()),
            telegram_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_ids,
            symbols,
            stake: parse_or(&get, "STAKE", 0.35)?,
            currency: get("CURRENCY").unwrap_or_else(|| "USD".to_string()),
            duration_minutes: parse_or(&get, "CONTRACT_DURATION_MINUTES", 1)?,
            loss_limit: parse_or(&get, "LOSS_LIMIT", 3)?,
            candle_count: parse_or(&get, "CANDLE_COUNT", 50)?,
            granularity_secs: parse_or(&get, "GRANULARITY_SECONDS", 60)?,
            order_failure_policy: parse_or(&get, "ORDER_FAILURE_POLICY", OrderFailurePolicy::Skip)?,
            paper_payout_ratio: parse_or(&get, "PAPER_PAYOUT_RATIO", 0.95)?,
            poll_interval: Duration::from_secs(parse_or(&get, "POLL_INTERVAL_SECS", 5)?),
            settlement_wait: Duration::from_secs(parse_or(&get, "SETTLEMENT_WAIT_SECS", 65)?),
            error_cooldown: Duration::from_secs(parse_or(&get, "ERROR_COOLDOWN_SECS", 30)?),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 15)?),
            strategy_config_path: get("STRATEGY_CONFIG_PATH"),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Telegram delivery is enabled only when both the token and a chat are set.
    pub fn telegram_enabled(&self) -> bool {
        self.telegram_token.is_some() && !self.telegram_chat_ids.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(Error::Config("SYMBOLS must list at least one instrument".into()));
        }
        if !(self.stake.is_finite() && self.stake > 0.0) {
            return Err(Error::Config(format!("STAKE must be positive, got {}", self.stake)));
        }
        if self.loss_limit == 0 {
            return Err(Error::Config("LOSS_LIMIT must be at least 1".into()));
        }
        if self.candle_count < 2 {
            return Err(Error::Config("CANDLE_COUNT must be at least 2".into()));
        }
        if self.duration_minutes == 0 {
            return Err(Error::Config("CONTRACT_DURATION_MINUTES must be at least 1".into()));
        }
        let contract_secs = u64::from(self.duration_minutes) * 60;
        if self.settlement_wait < Duration::from_secs(contract_secs) {
            return Err(Error::Config(format!(
                "SETTLEMENT_WAIT_SECS ({}) must cover the contract duration ({contract_secs}s)",
                self.settlement_wait.as_secs()
            )));
        }
        if self.granularity_secs == 0 {
            return Err(Error::Config("GRANULARITY_SECONDS must be positive".into()));
        }
        if !(self.paper_payout_ratio.is_finite() && self.paper_payout_ratio > 0.0) {
            return Err(Error::Config("PAPER_PAYOUT_RATIO must be positive".into()));
        }
        Ok(())
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}
