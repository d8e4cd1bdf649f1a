use async_trait::async_trait;
use serde_json::json;

use crate::{NotificationChannel, NotificationError};

pub const DISCORD_MAX_MESSAGE_LEN: usize = 2000;

pub struct DiscordWebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordWebhookNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationChannel for DiscordWebhookNotifier {
    async fn send(&self, text: &str) -> Result<(), NotificationError> {
        for chunk in crate::split_message(text, DISCORD_MAX_MESSAGE_LEN) {
            let payload = json!({
                "content": chunk,
                "username": "Portfolio Tracker",
            });

            let response = self
                .client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| NotificationError::Http(e.to_string()))?;

            if !response.status().is_success() {
                return Err(NotificationError::Discord(format!(
                    "webhook returned {}",
                    response.status()
                )));
            }
        }

        tracing::debug!("Discord notification sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "discord-webhook"
    }
}
