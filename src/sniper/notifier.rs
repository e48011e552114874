//! Outbound trade notifications.
//!
//! Delivery is fire-and-forget from the trading core's point of view: a failed or slow
//! notification is logged and never interrupts a buy or a sell.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tokio_retry::{strategy::ExponentialBackoff, Retry};
use tracing::{debug, info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Deliver a notification, swallowing failures and bounding the wait.
pub async fn notify_quietly(notifier: &dyn Notifier, message: &str, timeout: Duration) {
    match tokio::time::timeout(timeout, notifier.notify(message)).await {
        Ok(Ok(())) => debug!("Notification sent: {}", message),
        Ok(Err(e)) => warn!("Notification failed ({}): {:#}", message, e),
        Err(_) => warn!("Notification timed out after {:?}: {}", timeout, message),
    }
}

/// Writes notifications to the log. Used when no delivery channel is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        info!("[notify] {}", message);
        Ok(())
    }
}

/// Telegram Bot API delivery.
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http_client: Client,
    bot_token: String,
    chat_id: String,
    retry_attempts: usize,
}

impl TelegramNotifier {
    pub fn new(http_client: Client, bot_token: String, chat_id: String) -> Self {
        Self {
            http_client,
            bot_token,
            chat_id,
            retry_attempts: 3,
        }
    }

    /// Build from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`. `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if token.is_empty() || chat_id.is_empty() {
            return None;
        }
        Some(Self::new(Client::new(), token, chat_id))
    }

    fn endpoint(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token)
    }

    async fn send_once(&self, message: &str) -> Result<()> {
        let response = self
            .http_client
            .post(self.endpoint())
            .json(&json!({ "chat_id": self.chat_id, "text": message }))
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("Failed to reach Telegram API")?;

        if !response.status().is_success() {
            return Err(anyhow!("Telegram API returned {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let retry_strategy = ExponentialBackoff::from_millis(200)
            .max_delay(Duration::from_secs(2))
            .take(self.retry_attempts);

        Retry::spawn(retry_strategy, || self.send_once(message)).await
    }
}
