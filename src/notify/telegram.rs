use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;

use super::Notifier;
use crate::models::TelegramCredentials;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API `sendMessage`
pub struct TelegramNotifier {
    client: Client,
    base_url: String,
    credentials: TelegramCredentials,
}

impl TelegramNotifier {
    pub fn new(credentials: TelegramCredentials, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.credentials.bot_token);
        let params = [
            ("chat_id", self.credentials.chat_id.as_str()),
            ("text", message),
            ("parse_mode", "Markdown"),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("unreadable Telegram response (status {}): {}", status, e))?;

        if !status.is_success() || !body.ok {
            return Err(anyhow!(
                "Telegram rejected message with status {}: {}",
                status,
                body.description.unwrap_or_default()
            ));
        }
        Ok(())
    }
}
