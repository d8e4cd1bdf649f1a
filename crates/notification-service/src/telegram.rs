use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{NotificationChannel, NotificationError};

pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub parse_mode: &'a str,
    pub disable_web_page_preview: bool,
}

/// Bot API replies are `{"ok": bool, "description": ...}` even on HTTP errors.
pub fn check_response(body: &Value) -> Result<(), NotificationError> {
    if body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(());
    }
    let description = body
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Err(NotificationError::Telegram(description.to_string()))
}

/// Posts Markdown messages to one chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{}", bot_token),
            chat_id: chat_id.into(),
        }
    }

    async fn call(&self, method: &str, request: reqwest::RequestBuilder) -> Result<Value, NotificationError> {
        let body: Value = request
            .send()
            .await
            .map_err(|e| NotificationError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| NotificationError::Telegram(format!("{} returned invalid JSON: {}", method, e)))?;
        check_response(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotificationError> {
        for chunk in crate::split_message(text, TELEGRAM_MAX_MESSAGE_LEN) {
            let payload = SendMessage {
                chat_id: &self.chat_id,
                text: &chunk,
                parse_mode: "Markdown",
                disable_web_page_preview: true,
            };
            let request = self
                .client
                .post(format!("{}/sendMessage", self.base_url))
                .json(&payload);
            self.call("sendMessage", request).await?;
        }
        tracing::info!("Message sent to Telegram");
        Ok(())
    }

    async fn check(&self) -> Result<String, NotificationError> {
        let body = self
            .call("getMe", self.client.get(format!("{}/getMe", self.base_url)))
            .await?;
        let username = body["result"]["username"].as_str().unwrap_or("unknown");
        Ok(format!("Telegram bot @{}", username))
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
