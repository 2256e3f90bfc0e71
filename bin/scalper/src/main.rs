use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{CandleSource, Config, LogNotifier, Notifier, OrderGateway, TradingMode};
use engine::{ControllerConfig, DerivClient, RunOutcome, TradeController};
use paper::PaperGateway;
use strategy::{EmaRsiStrategy, SignalParams, StrategyFileConfig};
use telegram_notify::TelegramNotifier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid configuration")?;
    info!(
        mode = %cfg.trading_mode,
        symbols = ?cfg.symbols,
        stake = cfg.stake,
        currency = %cfg.currency,
        duration_minutes = cfg.duration_minutes,
        loss_limit = cfg.loss_limit,
        failure_policy = ?cfg.order_failure_policy,
        telegram = cfg.telegram_enabled(),
        "Scalper starting"
    );

    let params = match &cfg.strategy_config_path {
        Some(path) => {
            info!(path = %path, "Loading indicator parameters");
            StrategyFileConfig::load(path)
                .with_context(|| format!("failed to load strategy config {path}"))?
                .signal
        }
        None => SignalParams::default(),
    };

    // ── Venue ─────────────────────────────────────────────────────────────────
    let client = Arc::new(
        DerivClient::new(
            &cfg.deriv_ws_url,
            cfg.deriv_app_id,
            cfg.deriv_token.clone(),
            cfg.request_timeout,
        )
        .context("invalid Deriv endpoint")?,
    );
    check_dns(&client).await;

    let feed: Arc<dyn CandleSource> = client.clone();
    let gateway: Arc<dyn OrderGateway> = match cfg.trading_mode {
        TradingMode::Live => {
            info!("Live trading mode: orders go to Deriv");
            client
        }
        TradingMode::Paper => {
            info!(payout_ratio = cfg.paper_payout_ratio, "Paper trading mode: orders are simulated");
            Arc::new(PaperGateway::new(
                feed.clone(),
                cfg.paper_payout_ratio,
                cfg.granularity_secs,
            ))
        }
    };

    // ── Notifier ──────────────────────────────────────────────────────────────
    let (notifier, delivery) = match &cfg.telegram_token {
        Some(token) if cfg.telegram_enabled() => {
            let (notifier, handle) =
                TelegramNotifier::spawn(token.clone(), cfg.telegram_chat_ids.clone());
            (Arc::new(notifier) as Arc<dyn Notifier>, Some(handle))
        }
        _ => {
            info!("Telegram not configured; notifications go to the log");
            (Arc::new(LogNotifier) as Arc<dyn Notifier>, None)
        }
    };

    // ── Trade controller ──────────────────────────────────────────────────────
    let controller = TradeController::new(
        ControllerConfig::from_config(&cfg),
        feed,
        gateway,
        Box::new(EmaRsiStrategy::new(&params)),
        notifier.clone(),
    );

    tokio::select! {
        outcome = controller.run() => match &outcome {
            RunOutcome::LossLimitReached { consecutive_losses } => {
                warn!(consecutive_losses, "Loss limit reached. Exiting.");
            }
            RunOutcome::AuthFailed(reason) => warn!(%reason, "Authorization failed. Exiting."),
            RunOutcome::OrderFailed(reason) => warn!(%reason, "Order failed. Exiting."),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting.");
        }
    }

    // Let queued notifications drain before the runtime goes away.
    drop(notifier);
    if let Some(handle) = delivery {
        if tokio::time::timeout(Duration::from_secs(10), handle).await.is_err() {
            warn!("Timed out delivering pending notifications");
        }
    }
    Ok(())
}

/// Resolve the websocket host once so connectivity problems show up in the
/// log before the first candle request.
async fn check_dns(client: &DerivClient) {
    let endpoint = client.endpoint();
    let Some(host) = endpoint.host_str() else {
        warn!(endpoint = %endpoint, "Endpoint has no host");
        return;
    };
    let port = endpoint.port_or_known_default().unwrap_or(443);

    match tokio::net::lookup_host((host, port)).await {
        Ok(addrs) => {
            let addrs: Vec<_> = addrs.map(|a| a.ip().to_string()).collect();
            info!(host, ?addrs, "Resolved Deriv endpoint");
        }
        Err(e) => warn!(host, error = %e, "DNS lookup failed for Deriv endpoint"),
    }
}
