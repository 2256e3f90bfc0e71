use async_trait::async_trait;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use common::Notifier;

/// Messages buffered while the delivery task is busy. Anything beyond this
/// is dropped rather than stalling the trading loop.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Delivers operator messages to Telegram chats.
///
/// `notify` only enqueues; a background task owns the bot and sends each
/// message to every configured chat.
pub struct TelegramNotifier {
    tx: mpsc::Sender<String>,
}

impl TelegramNotifier {
    /// Start the delivery task. The task ends once the notifier is dropped
    /// and the queue has drained.
    pub fn spawn(token: String, chat_ids: Vec<i64>) -> (Self, JoinHandle<()>) {
        let bot = Bot::new(token);
        let chat_ids: Vec<ChatId> = chat_ids.into_iter().map(ChatId).collect();
        let (tx, mut rx) = mpsc::channel::<String>(DEFAULT_QUEUE_CAPACITY);

        info!(chats = chat_ids.len(), "Telegram notifier starting");
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                send_alert(&bot, &chat_ids, &message).await;
            }
            info!("Telegram notifier stopped");
        });

        (Self::with_queue(tx), handle)
    }

    fn with_queue(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.tx.try_send(text.to_string()) {
            warn!(error = %e, message = text, "Dropping Telegram notification");
        }
    }
}

/// Send a message to all configured chat IDs.
/// Failures are logged per chat and never returned.
async fn send_alert(bot: &Bot, chat_ids: &[ChatId], message: &str) {
    for &chat_id in chat_ids {
        if let Err(e) = bot.send_message(chat_id, message).await {
            warn!(chat_id = ?chat_id, error = %e, "Failed to send Telegram alert");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notify_enqueues_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let notifier = TelegramNotifier::with_queue(tx);

        notifier.notify("first").await;
        notifier.notify("second").await;

        assert_eq!(rx.recv().await.as_deref(), Some("first"));
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = TelegramNotifier::with_queue(tx);

        notifier.notify("kept").await;
        notifier.notify("dropped").await;

        assert_eq!(rx.recv().await.as_deref(), Some("kept"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_queue_is_ignored() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        TelegramNotifier::with_queue(tx).notify("nobody listening").await;
    }
}
