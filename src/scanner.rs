//! Sequential per-ticker scanning
//!
//! Tickers are processed one at a time with a fixed pause between them.
//! Each input ticker yields exactly one [`TickerOutcome`]: a report row, a
//! filter decision, or the reason it failed. Nothing is dropped silently.

use tracing::{info, warn};

use crate::analysis::indicators::{
    self, DEFAULT_IMPLIED_VOLATILITY, POP_HORIZON_YEARS, RISK_FREE_RATE, RSI_WINDOW, SMA_WINDOW,
    SUPPORT_BINS, SUPPORT_LOOKBACK, VOLUME_SPIKE_THRESHOLD, VOLUME_SPIKE_WINDOW,
};
use crate::analysis::scoring::{self, StatusInputs, StatusRules};
use crate::api::{ApiRateLimiter, MarketDataProvider};
use crate::error::ScanError;
use crate::models::{
    FundamentalRow, OptionsRow, PriceSeries, PullbackRow, PutActivity, PutContract, RankingRow,
    SectorSummaryRow, Snapshot, TechnicalMetrics, Ticker, Trend,
};
use crate::utils::{round1, round2, Lookback};

/// Log a progress line every this many tickers
pub const PROGRESS_EVERY: usize = 25;

/// What one ticker contributed to a scan
#[derive(Debug)]
pub enum Outcome<R> {
    Scanned(R),
    Filtered(String),
    Failed(ScanError),
}

#[derive(Debug)]
pub struct TickerOutcome<R> {
    pub ticker: Ticker,
    pub outcome: Outcome<R>,
}

/// Counts over a finished scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    pub total: usize,
    pub scanned: usize,
    pub filtered: usize,
    pub failed: usize,
}

/// Every outcome of a scan, in input order
#[derive(Debug)]
pub struct ScanReport<R> {
    pub outcomes: Vec<TickerOutcome<R>>,
}

impl<R> ScanReport<R> {
    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            total: self.outcomes.len(),
            ..ScanSummary::default()
        };
        for o in &self.outcomes {
            match o.outcome {
                Outcome::Scanned(_) => summary.scanned += 1,
                Outcome::Filtered(_) => summary.filtered += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    /// Scanned rows, consuming the report
    pub fn into_rows(self) -> Vec<R> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o.outcome {
                Outcome::Scanned(row) => Some(row),
                _ => None,
            })
            .collect()
    }
}

/// Result of evaluating one ticker successfully
#[derive(Debug)]
pub enum Evaluation<R> {
    Keep(R),
    Filter(String),
}

/// Per-ticker fetch-and-compute step of a scan
#[async_trait::async_trait]
pub trait ScanStrategy: Send + Sync {
    type Row: Send;

    fn name(&self) -> &'static str;

    /// Inter-request delay used when the caller does not override it
    fn default_delay_ms(&self) -> u64;

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &Ticker,
    ) -> Result<Evaluation<Self::Row>, ScanError>;
}

/// Run `strategy` over `tickers` sequentially, pausing between tickers
pub async fn scan_tickers<S: ScanStrategy>(
    provider: &dyn MarketDataProvider,
    strategy: &S,
    tickers: &[Ticker],
    limiter: ApiRateLimiter,
) -> ScanReport<S::Row> {
    info!("🚀 Starting {} scan over {} tickers", strategy.name(), tickers.len());

    let mut outcomes = Vec::with_capacity(tickers.len());
    for (i, ticker) in tickers.iter().enumerate() {
        if i > 0 {
            limiter.wait().await;
        }
        if i % PROGRESS_EVERY == 0 {
            info!("Progress: {}/{}...", i, tickers.len());
        }

        let outcome = match strategy.evaluate(provider, ticker).await {
            Ok(Evaluation::Keep(row)) => Outcome::Scanned(row),
            Ok(Evaluation::Filter(reason)) => {
                info!("Filtered {}: {}", ticker, reason);
                Outcome::Filtered(reason)
            }
            Err(e) => {
                warn!("Skipping {}: {}", ticker, e);
                Outcome::Failed(e)
            }
        };
        outcomes.push(TickerOutcome {
            ticker: ticker.clone(),
            outcome,
        });
    }

    let report = ScanReport { outcomes };
    let summary = report.summary();
    info!(
        "✅ {} scan finished: {} scanned, {} filtered, {} failed",
        strategy.name(),
        summary.scanned,
        summary.filtered,
        summary.failed
    );
    report
}

/// Trend, momentum and options metrics from a price series.
///
/// `implied_volatility` is the snapshot value when the provider had one;
/// otherwise the default volatility is used.
pub fn compute_technicals(
    series: &PriceSeries,
    implied_volatility: Option<f64>,
) -> Result<TechnicalMetrics, ScanError> {
    if series.len() < SMA_WINDOW {
        return Err(ScanError::InsufficientHistory {
            available: series.len(),
            required: SMA_WINDOW,
        });
    }

    let closes = series.closes();
    let price = series.last_close().ok_or(ScanError::MissingData("close"))?;
    if !(price > 0.0) {
        return Err(ScanError::InvalidPrice(price));
    }

    let sma200 = indicators::simple_moving_average(&closes, SMA_WINDOW)
        .ok_or(ScanError::MissingData("moving average"))?;
    let rsi = indicators::relative_strength_index(&closes, RSI_WINDOW)
        .ok_or(ScanError::MissingData("rsi"))?;
    let whale_support = indicators::volume_at_price_support(series.tail(SUPPORT_LOOKBACK), SUPPORT_BINS)
        .ok_or(ScanError::MissingData("volume profile"))?;

    let implied_volatility = implied_volatility.unwrap_or(DEFAULT_IMPLIED_VOLATILITY);
    let target_strike = indicators::target_strike(price, whale_support);
    let pop = indicators::probability_of_profit(
        price,
        target_strike,
        implied_volatility,
        POP_HORIZON_YEARS,
        RISK_FREE_RATE,
    );
    let volume_flag =
        indicators::volume_spike(&series.volumes(), VOLUME_SPIKE_WINDOW, VOLUME_SPIKE_THRESHOLD);

    Ok(TechnicalMetrics {
        price,
        sma200,
        rsi,
        whale_support,
        implied_volatility,
        target_strike,
        pop,
        trend: indicators::classify_trend(price, sma200),
        volume_flag,
    })
}

/// Snapshot for options metrics; a failed lookup only costs the volatility input
async fn implied_volatility(provider: &dyn MarketDataProvider, ticker: &Ticker) -> Option<f64> {
    match provider.snapshot(ticker).await {
        Ok(snapshot) => snapshot.implied_volatility,
        Err(e) => {
            warn!("No snapshot for {}, using default volatility: {:#}", ticker, e);
            None
        }
    }
}

/// Options-selling screen over a broad universe
#[derive(Debug, Clone)]
pub struct OptionsScreen {
    pub top_n: usize,
    pub rules: StatusRules,
}

impl Default for OptionsScreen {
    fn default() -> Self {
        Self {
            top_n: 20,
            rules: StatusRules::options_screen(),
        }
    }
}

impl OptionsScreen {
    pub fn build_row(&self, ticker: &Ticker, m: &TechnicalMetrics) -> OptionsRow {
        let rsi = round2(m.rsi);
        let status = self.rules.classify(&StatusInputs {
            pop: m.pop,
            rsi,
            trend: m.trend,
        });
        OptionsRow {
            ticker: ticker.to_string(),
            price: round2(m.price),
            rsi,
            whale_support: m.whale_support,
            pop: m.pop,
            match_score: scoring::match_score(m.rsi, m.pop),
            trend: m.trend,
            volume_flag: m.volume_flag,
            status,
        }
    }

    /// Best scores first, at most `top_n` rows
    pub fn finalize(&self, rows: Vec<OptionsRow>) -> Vec<OptionsRow> {
        scoring::rank_descending(rows, |r| r.match_score, Some(self.top_n))
    }
}

#[async_trait::async_trait]
impl ScanStrategy for OptionsScreen {
    type Row = OptionsRow;

    fn name(&self) -> &'static str {
        "options"
    }

    fn default_delay_ms(&self) -> u64 {
        1200
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &Ticker,
    ) -> Result<Evaluation<OptionsRow>, ScanError> {
        let series = provider.price_history(ticker, Lookback::OneYear).await?;
        if series.len() < SMA_WINDOW {
            return Err(ScanError::InsufficientHistory {
                available: series.len(),
                required: SMA_WINDOW,
            });
        }
        let iv = implied_volatility(provider, ticker).await;
        let metrics = compute_technicals(&series, iv)?;
        Ok(Evaluation::Keep(self.build_row(ticker, &metrics)))
    }
}

/// Uptrend names that have pulled back, with unusual put activity
#[derive(Debug, Clone)]
pub struct PullbackScreen {
    pub rsi_ceiling: f64,
}

impl Default for PullbackScreen {
    fn default() -> Self {
        Self { rsi_ceiling: 50.0 }
    }
}

/// `Unusual` when any put struck below `price` traded more contracts than its open interest
pub fn put_activity(puts: &[PutContract], price: f64) -> PutActivity {
    let unusual = puts
        .iter()
        .filter(|p| p.strike < price)
        .any(|p| matches!((p.volume, p.open_interest), (Some(v), Some(oi)) if v > oi));
    if unusual {
        PutActivity::Unusual
    } else {
        PutActivity::Quiet
    }
}

impl PullbackScreen {
    pub fn finalize(&self, rows: Vec<PullbackRow>) -> Vec<PullbackRow> {
        scoring::rank_descending(rows, |r| r.match_score, None)
    }
}

#[async_trait::async_trait]
impl ScanStrategy for PullbackScreen {
    type Row = PullbackRow;

    fn name(&self) -> &'static str {
        "pullback"
    }

    fn default_delay_ms(&self) -> u64 {
        500
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &Ticker,
    ) -> Result<Evaluation<PullbackRow>, ScanError> {
        let series = provider.price_history(ticker, Lookback::OneYear).await?;
        if series.len() < SMA_WINDOW {
            return Err(ScanError::InsufficientHistory {
                available: series.len(),
                required: SMA_WINDOW,
            });
        }

        // Trend and momentum gate first so filtered names cost one request
        let closes = series.closes();
        let price = series.last_close().ok_or(ScanError::MissingData("close"))?;
        let sma200 = indicators::simple_moving_average(&closes, SMA_WINDOW)
            .ok_or(ScanError::MissingData("moving average"))?;
        let rsi = indicators::relative_strength_index(&closes, RSI_WINDOW)
            .ok_or(ScanError::MissingData("rsi"))?;
        if indicators::classify_trend(price, sma200) != Trend::Bull {
            return Ok(Evaluation::Filter("below 200-day average".to_string()));
        }
        if rsi >= self.rsi_ceiling {
            return Ok(Evaluation::Filter(format!("RSI {:.2} is not a pullback", rsi)));
        }

        let iv = implied_volatility(provider, ticker).await;
        let m = compute_technicals(&series, iv)?;

        let put_activity = match provider.nearest_expiry_puts(ticker).await {
            Ok(puts) => put_activity(&puts, m.price),
            Err(e) => {
                warn!("Option chain unavailable for {}: {:#}", ticker, e);
                PutActivity::Unknown
            }
        };

        Ok(Evaluation::Keep(PullbackRow {
            ticker: ticker.to_string(),
            price: round2(m.price),
            rsi: round2(m.rsi),
            whale_support: m.whale_support,
            target_strike: m.target_strike,
            pop: m.pop,
            iv_percent: round2(m.implied_volatility * 100.0),
            put_activity,
            match_score: scoring::match_score(m.rsi, m.pop),
            status: scoring::pullback_status(m.pop, m.rsi),
        }))
    }
}

/// Large-cap fair value screen built from snapshot fundamentals only
#[derive(Debug, Clone)]
pub struct FundamentalScreen {
    pub min_market_cap: f64,
    pub top_n: usize,
}

impl Default for FundamentalScreen {
    fn default() -> Self {
        Self {
            min_market_cap: 20_000_000_000.0,
            top_n: 30,
        }
    }
}

/// Ranked master list plus the sector breakdown it was drawn from
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalResults {
    pub master: Vec<FundamentalRow>,
    pub sectors: Vec<SectorSummaryRow>,
}

impl FundamentalScreen {
    pub fn build_row(&self, ticker: &Ticker, s: &Snapshot) -> Result<FundamentalRow, ScanError> {
        let price = s.current_price.unwrap_or(0.0);
        if !(price > 0.0) {
            return Err(ScanError::InvalidPrice(price));
        }

        let fair = indicators::fair_value(s.trailing_eps.unwrap_or(0.0), s.earnings_growth.unwrap_or(0.05));
        let roe = s.return_on_equity.unwrap_or(0.0) * 100.0;
        let revenue_growth = s.revenue_growth.unwrap_or(0.0) * 100.0;
        let upside = (fair - price) / price * 100.0;
        let trap = revenue_growth < 0.0 || roe < 8.0;

        // A reported beta of zero means the provider had none
        let beta = s.beta.filter(|b| *b != 0.0).unwrap_or(1.0);
        let buffer = indicators::risk_buffer(beta);
        let stop_loss = round2(price * (1.0 - buffer));
        let target_sell = round2(fair.max(price * (1.0 + buffer * 2.0)));

        let roe = round1(roe);
        let upside = round1(upside);
        Ok(FundamentalRow {
            ticker: ticker.to_string(),
            name: s.short_name.clone().unwrap_or_else(|| "N/A".to_string()),
            sector: s.sector.clone().unwrap_or_else(|| "N/A".to_string()),
            price: round2(price),
            fair_value: fair,
            upside,
            stop_loss,
            target_sell,
            roe,
            revenue_growth: round1(revenue_growth),
            trap,
            dividend_yield: round2(s.dividend_yield.unwrap_or(0.0) * 100.0),
            quality_score: scoring::fundamental_quality(roe, upside),
        })
    }

    /// Sector averages over every row, and the best non-trap rows
    pub fn finalize(&self, rows: Vec<FundamentalRow>) -> FundamentalResults {
        let sectors = scoring::summarize_sectors(&rows);
        let clean: Vec<FundamentalRow> = rows.into_iter().filter(|r| !r.trap).collect();
        let master = scoring::rank_descending(clean, |r| r.quality_score, Some(self.top_n));
        FundamentalResults { master, sectors }
    }
}

#[async_trait::async_trait]
impl ScanStrategy for FundamentalScreen {
    type Row = FundamentalRow;

    fn name(&self) -> &'static str {
        "fundamentals"
    }

    fn default_delay_ms(&self) -> u64 {
        600
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &Ticker,
    ) -> Result<Evaluation<FundamentalRow>, ScanError> {
        let snapshot = provider.snapshot(ticker).await?;
        let market_cap = snapshot.market_cap.unwrap_or(0.0);
        if market_cap < self.min_market_cap {
            return Ok(Evaluation::Filter(format!("market cap {:.0} below threshold", market_cap)));
        }
        Ok(Evaluation::Keep(self.build_row(ticker, &snapshot)?))
    }
}

/// Multi-year performance plus a fundamental quality score
#[derive(Debug, Clone)]
pub struct QualityRanking {
    pub initial_investment: f64,
    pub lookback: Lookback,
}

impl Default for QualityRanking {
    fn default() -> Self {
        Self {
            initial_investment: 10_000.0,
            lookback: Lookback::ThreeYears,
        }
    }
}

impl QualityRanking {
    pub fn build_row(&self, ticker: &Ticker, series: &PriceSeries, s: &Snapshot) -> Result<RankingRow, ScanError> {
        let (start, end) = match (series.first_close(), series.last_close()) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ScanError::InsufficientHistory {
                    available: 0,
                    required: 1,
                })
            }
        };
        if !(start > 0.0) {
            return Err(ScanError::InvalidPrice(start));
        }

        let total = indicators::total_return(start, end);
        let cagr = indicators::cagr(start, end, self.lookback.years() as f64);
        let growth = self.initial_investment * (1.0 + total / 100.0);

        let revenue_growth = s.revenue_growth.unwrap_or(0.0);
        let roe = s.return_on_equity.unwrap_or(0.0);
        let dividend_yield = s.dividend_yield.unwrap_or(0.0);
        let forward_pe = s.forward_pe.unwrap_or(100.0);

        Ok(RankingRow {
            global_rank: 0,
            ticker: ticker.to_string(),
            quality_score: scoring::ranking_quality(revenue_growth, roe, dividend_yield, forward_pe),
            cagr: round2(cagr),
            total_return: round2(total),
            growth_of_10k: round2(growth),
            dividend_yield: round2(dividend_yield * 100.0),
            forward_pe: round2(forward_pe),
        })
    }

    /// Sort by quality and number the rows from 1
    pub fn finalize(&self, rows: Vec<RankingRow>) -> Vec<RankingRow> {
        let mut ranked = scoring::rank_descending(rows, |r| r.quality_score, None);
        for (i, row) in ranked.iter_mut().enumerate() {
            row.global_rank = i + 1;
        }
        ranked
    }
}

#[async_trait::async_trait]
impl ScanStrategy for QualityRanking {
    type Row = RankingRow;

    fn name(&self) -> &'static str {
        "ranking"
    }

    fn default_delay_ms(&self) -> u64 {
        500
    }

    async fn evaluate(
        &self,
        provider: &dyn MarketDataProvider,
        ticker: &Ticker,
    ) -> Result<Evaluation<RankingRow>, ScanError> {
        let series = provider.price_history(ticker, self.lookback).await?;
        if series.is_empty() {
            return Err(ScanError::InsufficientHistory {
                available: 0,
                required: 1,
            });
        }
        let snapshot = provider.snapshot(ticker).await?;
        Ok(Evaluation::Keep(self.build_row(ticker, &series, &snapshot)?))
    }
}
