//! CSV output with a fixed column schema per scan

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::models::{FundamentalRow, OptionsRow, PullbackRow, RankingRow, SectorSummaryRow};

pub const OPTIONS_REPORT: &str = "Options_Whale_Screen_2026.csv";
pub const FUNDAMENTALS_REPORT: &str = "Ultimate_Whale_Master_2026.csv";
pub const SECTOR_REPORT: &str = "Whale_Sector_Summary_2026.csv";
pub const RANKING_REPORT: &str = "Global_Whale_Rankings_2026.csv";

/// A serializable row with a fixed header. Column order is part of the
/// contract with downstream consumers and must match field order.
pub trait ReportRow: Serialize {
    const HEADERS: &'static [&'static str];
}

impl ReportRow for OptionsRow {
    const HEADERS: &'static [&'static str] = &[
        "Ticker", "Price", "RSI", "Whale_Support", "PoP_%", "Match_Score", "Trend", "Volume_Spike", "Status",
    ];
}

impl ReportRow for PullbackRow {
    const HEADERS: &'static [&'static str] = &[
        "Ticker", "Price", "RSI", "Whale_Support", "Target_Strike", "PoP_%", "IV_%", "UOA", "Match_Score", "Status",
    ];
}

impl ReportRow for FundamentalRow {
    const HEADERS: &'static [&'static str] = &[
        "Ticker", "Name", "Sector", "Price", "Fair_Value", "Upside_%", "Stop_Loss", "Target_Sell", "ROE_%",
        "Rev_Growth_%", "Trap_Warning", "Dividend_Yield_%", "Quality_Score",
    ];
}

impl ReportRow for SectorSummaryRow {
    const HEADERS: &'static [&'static str] = &["Sector", "Avg_Upside_%", "Avg_ROE_%", "Count"];
}

impl ReportRow for RankingRow {
    const HEADERS: &'static [&'static str] = &[
        "Global_Rank", "Ticker", "Quality_Score", "CAGR_%", "Total_Return_%", "Growth_of_10k", "Div_Yield_%",
        "Forward_PE",
    ];
}

/// Overwrite `path` with a header row followed by `rows`. The header is
/// written even when `rows` is empty.
pub fn write_report<R: ReportRow>(path: &Path, rows: &[R]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create report {}", path.display()))?;
    write_rows(file, rows).with_context(|| format!("failed to write report {}", path.display()))?;
    info!("💾 Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_rows<W: Write, R: ReportRow>(out: W, rows: &[R]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(R::HEADERS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
