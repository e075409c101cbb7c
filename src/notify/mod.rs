//! Outbound alerts. Every failure here is logged and swallowed; a missing
//! credential or a rejected delivery never fails a scan.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::models::Config;

pub mod digest;
pub mod telegram;
pub mod whatsapp;

pub use telegram::TelegramNotifier;
pub use whatsapp::WhatsAppNotifier;

/// A messaging endpoint that accepts a short text digest
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str) -> Result<()>;
}

/// Fan-out over every configured notifier
#[derive(Default)]
pub struct NotificationHub {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotificationHub {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Notifiers for whichever credential sets are present in `config`
    pub fn from_config(config: &Config) -> Self {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

        if let Some(creds) = &config.telegram {
            match TelegramNotifier::new(creds.clone(), &config.telegram_base_url) {
                Ok(n) => notifiers.push(Box::new(n)),
                Err(e) => warn!("Telegram notifier unavailable: {:#}", e),
            }
        }
        if let Some(creds) = &config.twilio {
            match WhatsAppNotifier::new(creds.clone(), &config.twilio_base_url) {
                Ok(n) => notifiers.push(Box::new(n)),
                Err(e) => warn!("WhatsApp notifier unavailable: {:#}", e),
            }
        }

        Self { notifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Deliver `message` everywhere; returns how many endpoints accepted it
    pub async fn broadcast(&self, message: &str) -> usize {
        if self.notifiers.is_empty() {
            info!("Messaging credentials missing. Skipping alert.");
            return 0;
        }

        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.send(message).await {
                Ok(()) => {
                    info!("📨 {} alert sent successfully", notifier.name());
                    delivered += 1;
                }
                Err(e) => error!("Failed to send {} alert: {:#}", notifier.name(), e),
            }
        }
        delivered
    }
}
