//! In-memory collaborators for pipeline tests

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use whale_screener::api::MarketDataProvider;
use whale_screener::models::{PriceSeries, PutContract, Snapshot, Ticker};
use whale_screener::notify::Notifier;
use whale_screener::utils::Lookback;

/// Provider answering from fixed maps; unknown tickers fail like a 404
#[derive(Default)]
pub struct StaticProvider {
    histories: HashMap<String, PriceSeries>,
    snapshots: HashMap<String, Snapshot>,
    puts: HashMap<String, Vec<PutContract>>,
    requests: Mutex<Vec<String>>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(mut self, symbol: &str, series: PriceSeries) -> Self {
        self.histories.insert(symbol.to_string(), series);
        self
    }

    pub fn with_snapshot(mut self, symbol: &str, snapshot: Snapshot) -> Self {
        self.snapshots.insert(symbol.to_string(), snapshot);
        self
    }

    pub fn with_puts(mut self, symbol: &str, puts: Vec<PutContract>) -> Self {
        self.puts.insert(symbol.to_string(), puts);
        self
    }

    /// Every request made so far, as `kind:SYMBOL`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, ticker: &Ticker) {
        self.requests.lock().unwrap().push(format!("{}:{}", kind, ticker));
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for StaticProvider {
    async fn price_history(&self, ticker: &Ticker, _lookback: Lookback) -> Result<PriceSeries> {
        self.record("history", ticker);
        self.histories
            .get(ticker.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("API request failed with status 404 Not Found"))
    }

    async fn snapshot(&self, ticker: &Ticker) -> Result<Snapshot> {
        self.record("snapshot", ticker);
        self.snapshots
            .get(ticker.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("no snapshot for {}", ticker))
    }

    async fn nearest_expiry_puts(&self, ticker: &Ticker) -> Result<Vec<PutContract>> {
        self.record("puts", ticker);
        self.puts
            .get(ticker.as_str())
            .cloned()
            .ok_or_else(|| anyhow!("no listed options for {}", ticker))
    }
}

/// Notifier that keeps every delivered message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &str) -> Result<()> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}
