use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};

use super::Notifier;
use crate::models::TwilioCredentials;

/// WhatsApp delivery through the Twilio Messages API
pub struct WhatsAppNotifier {
    client: Client,
    base_url: String,
    credentials: TwilioCredentials,
}

impl WhatsAppNotifier {
    pub fn new(credentials: TwilioCredentials, base_url: &str) -> Result<Self> {
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

/// Twilio routes to WhatsApp only when the address carries the channel prefix
fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

#[async_trait::async_trait]
impl Notifier for WhatsAppNotifier {
    fn name(&self) -> &'static str {
        "WhatsApp"
    }

    async fn send(&self, message: &str) -> Result<()> {
        let creds = &self.credentials;
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, creds.account_sid
        );

        let auth_header =
            general_purpose::STANDARD.encode(format!("{}:{}", creds.account_sid, creds.auth_token));
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(&format!("Basic {}", auth_header))?);

        let to = whatsapp_address(&creds.to_number);
        let from = whatsapp_address(&creds.from_number);
        let params = [("From", from.as_str()), ("To", to.as_str()), ("Body", message)];

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Twilio request failed with status {}: {}", status, error_text));
        }
        Ok(())
    }
}
