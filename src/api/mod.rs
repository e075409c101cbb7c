use anyhow::Result;
use std::time::Duration;

use crate::models::{PriceSeries, PutContract, Snapshot, Ticker};
use crate::utils::Lookback;

pub mod yahoo_client;
pub use yahoo_client::YahooClient;

/// Fixed pause between consecutive provider requests
#[derive(Debug, Clone, Copy)]
pub struct ApiRateLimiter {
    delay: Duration,
}

impl ApiRateLimiter {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Market-data capability the scanner depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars over the lookback window, date ascending
    async fn price_history(&self, ticker: &Ticker, lookback: Lookback) -> Result<PriceSeries>;

    /// Current metadata; absent fields are `None`
    async fn snapshot(&self, ticker: &Ticker) -> Result<Snapshot>;

    /// Puts on the nearest listed expiry
    async fn nearest_expiry_puts(&self, ticker: &Ticker) -> Result<Vec<PutContract>>;
}
