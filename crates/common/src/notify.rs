use async_trait::async_trait;
use tracing::info;

/// One-way delivery of operator messages.
///
/// Delivery is best-effort: implementations swallow and log their own
/// failures, so trading never depends on the messaging service.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}

/// Notifier used when no messaging service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) {
        info!(target: "notify", "{text}");
    }
}
