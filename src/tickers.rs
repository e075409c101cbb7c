//! Ticker universe: a fixed list or the symbol column of a public HTML table

use anyhow::{anyhow, Result};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{error, info};

use crate::models::{Config, Ticker};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

/// Large caps used by the pullback scan
pub const PULLBACK_UNIVERSE: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "TSLA", "GOOGL", "AMZN", "META", "BRK-B", "UNH", "JNJ",
];

/// Growth, tech and dividend mix used by the ranking
pub const RANKING_WATCHLIST: &[&str] = &[
    "AAPL", "MSFT", "NVDA", "AVGO", "COST", "PG", "JPM", "V", "ABBV", "XOM",
];

#[derive(Debug, Clone)]
pub enum TickerSource {
    Static(Vec<Ticker>),
    Table { url: String },
}

impl TickerSource {
    pub fn from_symbols<S: AsRef<str>>(symbols: &[S]) -> Self {
        TickerSource::Static(symbols.iter().map(|s| Ticker::new(s.as_ref())).collect())
    }

    /// S&P 500 constituents table configured for this run
    pub fn sp500(config: &Config) -> Self {
        TickerSource::Table {
            url: config.sp500_table_url.clone(),
        }
    }

    /// Resolve the universe. A failed table fetch is logged and yields an
    /// empty list so the run still produces a (header-only) report.
    pub async fn load(&self) -> Vec<Ticker> {
        match self {
            TickerSource::Static(tickers) => tickers.clone(),
            TickerSource::Table { url } => match fetch_table_symbols(url).await {
                Ok(tickers) => {
                    info!("✅ Parsed {} tickers from {}", tickers.len(), url);
                    tickers
                }
                Err(e) => {
                    error!("Error fetching tickers from {}: {:#}", url, e);
                    Vec::new()
                }
            },
        }
    }
}

async fn fetch_table_symbols(url: &str) -> Result<Vec<Ticker>> {
    info!("🌐 Fetching ticker table from {}", url);

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .user_agent(BROWSER_USER_AGENT)
        .build()?;
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(anyhow!("ticker table request failed with status {}", response.status()));
    }
    let html = response.text().await?;
    parse_symbol_table(&html)
}

/// Symbols from the `Symbol` column of the first table that has one
pub fn parse_symbol_table(html: &str) -> Result<Vec<Ticker>> {
    let document = Html::parse_document(html);
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("th, td")?;

    for table in document.select(&table_sel) {
        let mut rows = table.select(&row_sel);
        let Some(header) = rows.next() else {
            continue;
        };
        let Some(column) = header
            .select(&cell_sel)
            .position(|cell| cell_text(&cell).eq_ignore_ascii_case("symbol"))
        else {
            continue;
        };

        let tickers = rows
            .filter_map(|row| row.select(&cell_sel).nth(column))
            .map(|cell| cell_text(&cell))
            .filter(|text| !text.is_empty())
            .map(|text| Ticker::new(&text))
            .collect();
        return Ok(tickers);
    }

    Err(anyhow!("no table with a Symbol column found"))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid CSS selector {}: {:?}", css, e))
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
