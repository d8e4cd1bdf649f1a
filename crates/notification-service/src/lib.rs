mod discord;
mod telegram;

pub use discord::DiscordWebhookNotifier;
pub use telegram::TelegramNotifier;

use async_trait::async_trait;

/// A destination for formatted report text.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotificationError>;

    /// Verify credentials without sending a message. Returns a short description.
    async fn check(&self) -> Result<String, NotificationError> {
        Ok(format!("{} configured", self.name()))
    }

    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Telegram API error: {0}")]
    Telegram(String),
    #[error("Discord webhook error: {0}")]
    Discord(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_webhook_url: Option<String>,
}

impl NotificationConfig {
    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        Self {
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            discord_webhook_url: get("DISCORD_WEBHOOK_URL"),
        }
    }

    pub fn validate(&self) -> Result<(), NotificationError> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(_), None) => Err(NotificationError::Config("TELEGRAM_CHAT_ID is not set".to_string())),
            (None, Some(_)) => Err(NotificationError::Config("TELEGRAM_BOT_TOKEN is not set".to_string())),
            _ => Ok(()),
        }
    }
}

/// Dispatches text to every configured channel.
#[derive(Default)]
pub struct NotificationService {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Self {
        let mut service = Self::default();

        if let (Some(token), Some(chat_id)) = (&config.telegram_bot_token, &config.telegram_chat_id) {
            service.add_channel(Box::new(TelegramNotifier::new(token, chat_id.clone())));
            tracing::info!("Telegram notifications enabled");
        }

        if let Some(ref webhook_url) = config.discord_webhook_url {
            service.add_channel(Box::new(DiscordWebhookNotifier::new(webhook_url.clone())));
            tracing::info!("Discord webhook notifications enabled");
        }

        if service.is_empty() {
            tracing::info!(
                "No notification channels configured (set TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID or DISCORD_WEBHOOK_URL)"
            );
        }

        service
    }

    pub fn add_channel(&mut self, channel: Box<dyn NotificationChannel>) {
        self.channels.push(channel);
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send to all channels, awaiting each. Returns how many accepted the message.
    pub async fn send(&self, text: &str) -> usize {
        let mut delivered = 0;
        for channel in &self.channels {
            match channel.send(text).await {
                Ok(()) => {
                    tracing::debug!("Sent notification via {}", channel.name());
                    delivered += 1;
                }
                Err(e) => tracing::warn!("Failed to send notification via {}: {}", channel.name(), e),
            }
        }
        delivered
    }

    pub async fn check_all(&self) -> Vec<(String, Result<String, NotificationError>)> {
        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            results.push((channel.name().to_string(), channel.check().await));
        }
        results
    }
}

/// Split `text` into pieces of at most `max_chars` characters, breaking on
/// line boundaries where possible.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars || max_chars == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        sent: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationChannel for Recorder {
        async fn send(&self, text: &str) -> Result<(), NotificationError> {
            if self.fail {
                return Err(NotificationError::Http("connection refused".to_string()));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn name(&self) -> &str {
            if self.fail {
                "broken"
            } else {
                "recorder"
            }
        }
    }

    #[tokio::test]
    async fn test_send_reaches_every_channel() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut service = NotificationService::default();
        service.add_channel(Box::new(Recorder { sent: sent.clone(), fail: true }));
        service.add_channel(Box::new(Recorder { sent: sent.clone(), fail: false }));

        assert_eq!(service.send("hello").await, 1);
        assert_eq!(sent.lock().unwrap().as_slice(), ["hello".to_string()]);

        let checks = service.check_all().await;
        assert_eq!(checks.len(), 2);
        assert!(checks.iter().all(|(_, r)| r.is_ok()));
    }

    #[test]
    fn test_config_from_lookup() {
        let config = NotificationConfig::from_lookup(|key| match key {
            "TELEGRAM_BOT_TOKEN" => Some("123:abc".to_string()),
            "TELEGRAM_CHAT_ID" => Some("  ".to_string()),
            _ => None,
        });
        assert!(config.telegram_bot_token.is_some());
        assert!(config.telegram_chat_id.is_none());
        assert!(config.validate().is_err());

        let service = NotificationService::new(&config);
        assert!(service.is_empty());
    }

    #[test]
    fn test_service_builds_configured_channels() {
        let config = NotificationConfig {
            telegram_bot_token: Some("123:abc".to_string()),
            telegram_chat_id: Some("42".to_string()),
            discord_webhook_url: Some("https://discord.test/webhook".to_string()),
        };
        assert!(config.validate().is_ok());
        let service = NotificationService::new(&config);
        assert_eq!(service.channel_names(), vec!["telegram", "discord-webhook"]);
    }

    #[test]
    fn test_split_message() {
        assert_eq!(split_message("short", 10), vec!["short"]);

        let text = "line one\nline two\nline three\n";
        let chunks = split_message(text, 18);
        assert_eq!(chunks, vec!["line one\nline two\n", "line three\n"]);
        assert_eq!(chunks.concat(), text);

        let long = "x".repeat(25);
        let chunks = split_message(&long, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }
}
