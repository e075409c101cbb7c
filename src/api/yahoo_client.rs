use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::MarketDataProvider;
use crate::models::{Config, PriceBar, PriceSeries, PutContract, Snapshot, Ticker};
use crate::utils::Lookback;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";
const SNAPSHOT_MODULES: &str = "price,summaryDetail,financialData,defaultKeyStatistics,assetProfile";

/// Chart endpoint response
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<String>,
    description: Option<String>,
}

impl ApiError {
    fn into_error(self, symbol: &str) -> anyhow::Error {
        anyhow!(
            "{} for {}: {}",
            self.code.unwrap_or_else(|| "error".to_string()),
            symbol,
            self.description.unwrap_or_default()
        )
    }
}

/// quoteSummary endpoint response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<SummaryResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: PriceModule,
    #[serde(default)]
    summary_detail: SummaryDetailModule,
    #[serde(default)]
    financial_data: FinancialDataModule,
    #[serde(default)]
    default_key_statistics: KeyStatisticsModule,
    #[serde(default)]
    asset_profile: AssetProfileModule,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; `{}` means missing
#[derive(Debug, Default, Deserialize)]
struct Raw {
    raw: Option<f64>,
}

fn raw(value: &Option<Raw>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    short_name: Option<String>,
    regular_market_price: Option<Raw>,
    market_cap: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    beta: Option<Raw>,
    dividend_yield: Option<Raw>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<Raw>,
    market_cap: Option<Raw>,
    implied_volatility: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    current_price: Option<Raw>,
    revenue_growth: Option<Raw>,
    earnings_growth: Option<Raw>,
    return_on_equity: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    trailing_eps: Option<Raw>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<Raw>,
    shares_outstanding: Option<Raw>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfileModule {
    sector: Option<String>,
}

impl From<SummaryResult> for Snapshot {
    fn from(s: SummaryResult) -> Self {
        Snapshot {
            short_name: s.price.short_name,
            sector: s.asset_profile.sector,
            current_price: raw(&s.financial_data.current_price).or(raw(&s.price.regular_market_price)),
            market_cap: raw(&s.price.market_cap).or(raw(&s.summary_detail.market_cap)),
            implied_volatility: raw(&s.summary_detail.implied_volatility),
            trailing_eps: raw(&s.default_key_statistics.trailing_eps),
            earnings_growth: raw(&s.financial_data.earnings_growth),
            revenue_growth: raw(&s.financial_data.revenue_growth),
            return_on_equity: raw(&s.financial_data.return_on_equity),
            beta: raw(&s.summary_detail.beta),
            dividend_yield: raw(&s.summary_detail.dividend_yield),
            forward_pe: raw(&s.summary_detail.forward_pe).or(raw(&s.default_key_statistics.forward_pe)),
            shares_outstanding: raw(&s.default_key_statistics.shares_outstanding),
        }
    }
}

/// Options endpoint response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionsEnvelope {
    option_chain: OptionsBody,
}

#[derive(Debug, Deserialize)]
struct OptionsBody {
    result: Option<Vec<OptionsResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct OptionsResult {
    #[serde(default)]
    options: Vec<OptionsExpiry>,
}

#[derive(Debug, Deserialize)]
struct OptionsExpiry {
    #[serde(default)]
    puts: Vec<OptionContract>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionContract {
    strike: f64,
    volume: Option<u64>,
    open_interest: Option<u64>,
}

/// Yahoo Finance client
pub struct YahooClient {
    client: Client,
    base_url: String,
}

impl YahooClient {
    /// Create a new Yahoo client
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.yahoo_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .with_context(|| format!("invalid provider url for path {}", path))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("Making request to: {}", url);

        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("API request failed with status {}: {}", status, error_text));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("unexpected response body from {}", url.path()))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooClient {
    async fn price_history(&self, ticker: &Ticker, lookback: Lookback) -> Result<PriceSeries> {
        let end = Utc::now();
        let start = lookback.start_date(end.date_naive());
        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);

        let mut url = self.endpoint(&format!("/v8/finance/chart/{}", ticker))?;
        url.query_pairs_mut()
            .append_pair("period1", &period1.to_string())
            .append_pair("period2", &end.timestamp().to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history");

        let envelope: ChartEnvelope = self.get_json(url).await?;
        if let Some(err) = envelope.chart.error {
            return Err(err.into_error(ticker.as_str()));
        }
        let result = envelope
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
            .ok_or_else(|| anyhow!("no chart data for {}", ticker))?;

        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, ts) in result.timestamp.iter().enumerate() {
            // Rows without a close (halts, partial sessions) are dropped
            let Some(close) = quote.close.get(i).copied().flatten() else {
                continue;
            };
            let Some(date) = DateTime::from_timestamp(*ts, 0).map(|dt| dt.date_naive()) else {
                continue;
            };
            bars.push(PriceBar {
                date,
                open: quote.open.get(i).copied().flatten().unwrap_or(close),
                high: quote.high.get(i).copied().flatten().unwrap_or(close),
                low: quote.low.get(i).copied().flatten().unwrap_or(close),
                close,
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            });
        }

        debug!("Retrieved {} price bars for {}", bars.len(), ticker);
        Ok(PriceSeries::new(bars))
    }

    async fn snapshot(&self, ticker: &Ticker) -> Result<Snapshot> {
        let mut url = self.endpoint(&format!("/v10/finance/quoteSummary/{}", ticker))?;
        url.query_pairs_mut().append_pair("modules", SNAPSHOT_MODULES);

        let envelope: SummaryEnvelope = self.get_json(url).await?;
        if let Some(err) = envelope.quote_summary.error {
            return Err(err.into_error(ticker.as_str()));
        }
        let result = envelope
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| anyhow!("no snapshot for {}", ticker))?;

        Ok(result.into())
    }

    async fn nearest_expiry_puts(&self, ticker: &Ticker) -> Result<Vec<PutContract>> {
        let url = self.endpoint(&format!("/v7/finance/options/{}", ticker))?;

        let envelope: OptionsEnvelope = self.get_json(url).await?;
        if let Some(err) = envelope.option_chain.error {
            return Err(err.into_error(ticker.as_str()));
        }
        let expiry = envelope
            .option_chain
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.options.into_iter().next())
            .ok_or_else(|| anyhow!("no listed options for {}", ticker))?;

        Ok(expiry
            .puts
            .into_iter()
            .map(|c| PutContract {
                strike: c.strike,
                volume: c.volume,
                open_interest: c.open_interest,
            })
            .collect())
    }
}
