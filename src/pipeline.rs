//! End-to-end runs: source → scan → rank → write → notify

use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::api::{ApiRateLimiter, MarketDataProvider};
use crate::models::{FundamentalRow, OptionsRow, PullbackRow, RankingRow};
use crate::notify::{digest, NotificationHub};
use crate::report::{self, FUNDAMENTALS_REPORT, OPTIONS_REPORT, RANKING_REPORT, SECTOR_REPORT};
use crate::scanner::{
    scan_tickers, FundamentalResults, FundamentalScreen, OptionsScreen, PullbackScreen, QualityRanking,
    ScanReport, ScanStrategy, ScanSummary,
};
use crate::tickers::TickerSource;

/// Run-wide settings resolved from config and CLI flags
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    /// Overrides each strategy's default delay
    pub delay_ms: Option<u64>,
    pub notify: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            delay_ms: None,
            notify: true,
        }
    }
}

/// What a run wrote
#[derive(Debug)]
pub struct RunOutput<R> {
    pub summary: ScanSummary,
    pub rows: R,
    pub reports: Vec<PathBuf>,
    pub notified: usize,
}

pub struct Pipeline<'a> {
    provider: &'a dyn MarketDataProvider,
    hub: &'a NotificationHub,
    settings: RunSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, hub: &'a NotificationHub, settings: RunSettings) -> Self {
        Self { provider, hub, settings }
    }

    async fn scan<S: ScanStrategy>(&self, strategy: &S, source: &TickerSource) -> ScanReport<S::Row> {
        let tickers = source.load().await;
        if tickers.is_empty() {
            warn!("Ticker list is empty; {} scan has nothing to do", strategy.name());
        }
        let delay = self.settings.delay_ms.unwrap_or_else(|| strategy.default_delay_ms());
        scan_tickers(self.provider, strategy, &tickers, ApiRateLimiter::new(delay)).await
    }

    async fn notify(&self, message: &str) -> usize {
        if !self.settings.notify {
            info!("Notifications disabled for this run");
            return 0;
        }
        self.hub.broadcast(message).await
    }

    async fn notify_no_data(&self, scan: &str) -> usize {
        warn!("❌ No data collected by the {} scan. Check ticker list or API status.", scan);
        self.notify(&digest::no_data(scan)).await
    }

    pub async fn run_options(&self, strategy: &OptionsScreen, source: &TickerSource) -> Result<RunOutput<Vec<OptionsRow>>> {
        let report = self.scan(strategy, source).await;
        let summary = report.summary();
        let rows = strategy.finalize(report.into_rows());

        let path = self.settings.output_dir.join(OPTIONS_REPORT);
        report::write_report(&path, &rows)?;

        let notified = if rows.is_empty() {
            self.notify_no_data(strategy.name()).await
        } else {
            self.notify(&digest::options(&rows, OPTIONS_REPORT)).await
        };

        Ok(RunOutput { summary, rows, reports: vec![path], notified })
    }

    pub async fn run_pullback(&self, strategy: &PullbackScreen, source: &TickerSource) -> Result<RunOutput<Vec<PullbackRow>>> {
        let report = self.scan(strategy, source).await;
        let summary = report.summary();
        let rows = strategy.finalize(report.into_rows());

        let path = self.settings.output_dir.join(OPTIONS_REPORT);
        report::write_report(&path, &rows)?;
        info!("Success! {} candidates saved to {}", rows.len(), path.display());

        let notified = if rows.is_empty() {
            self.notify_no_data(strategy.name()).await
        } else {
            self.notify(&digest::pullback(&rows, OPTIONS_REPORT)).await
        };

        Ok(RunOutput { summary, rows, reports: vec![path], notified })
    }

    pub async fn run_fundamentals(
        &self,
        strategy: &FundamentalScreen,
        source: &TickerSource,
    ) -> Result<RunOutput<FundamentalResults>> {
        let report = self.scan(strategy, source).await;
        let summary = report.summary();
        let rows: Vec<FundamentalRow> = report.into_rows();

        let master_path = self.settings.output_dir.join(FUNDAMENTALS_REPORT);
        if rows.is_empty() {
            // No grouping on an empty set; leave a fresh header-only master file
            report::write_report::<FundamentalRow>(&master_path, &[])?;
            let notified = self.notify_no_data(strategy.name()).await;
            return Ok(RunOutput {
                summary,
                rows: FundamentalResults { master: Vec::new(), sectors: Vec::new() },
                reports: vec![master_path],
                notified,
            });
        }

        let results = strategy.finalize(rows);
        let sector_path = self.settings.output_dir.join(SECTOR_REPORT);
        report::write_report(&master_path, &results.master)?;
        report::write_report(&sector_path, &results.sectors)?;

        let notified = self.notify(&digest::fundamentals(&results.master)).await;
        info!("✅ System run complete.");

        Ok(RunOutput {
            summary,
            rows: results,
            reports: vec![master_path, sector_path],
            notified,
        })
    }

    pub async fn run_ranking(&self, strategy: &QualityRanking, source: &TickerSource) -> Result<RunOutput<Vec<RankingRow>>> {
        let report = self.scan(strategy, source).await;
        let summary = report.summary();
        let rows = strategy.finalize(report.into_rows());

        let path = self.settings.output_dir.join(RANKING_REPORT);
        report::write_report(&path, &rows)?;

        let notified = if rows.is_empty() {
            self.notify_no_data(strategy.name()).await
        } else {
            self.notify(&digest::ranking(&rows)).await
        };

        Ok(RunOutput { summary, rows, reports: vec![path], notified })
    }
}
