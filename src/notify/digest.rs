//! Human-readable alert bodies

use crate::models::{FundamentalRow, OptionsRow, PullbackRow, PullbackStatus, RankingRow, Status};

/// Tickers named in an options digest
pub const OPTIONS_DIGEST_SIZE: usize = 5;
/// Rows quoted in a fundamentals digest
pub const FUNDAMENTALS_DIGEST_SIZE: usize = 3;

/// Backslash-escape the characters Telegram's Markdown mode treats as
/// entity markers, so interpolated names never open an unclosed entity.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Sent when a scan finishes with nothing to report
pub fn no_data(scan: &str) -> String {
    format!(
        "⚠️ *Whale Scan Error:* No data collected by the {} scan this run.",
        escape_markdown(scan)
    )
}

/// Prime picks, or the best scores when nothing qualified as prime
pub fn options_picks(rows: &[OptionsRow]) -> Vec<&str> {
    let primes: Vec<&str> = rows
        .iter()
        .filter(|r| r.status == Status::Prime)
        .map(|r| r.ticker.as_str())
        .collect();
    let picks = if primes.is_empty() {
        rows.iter().map(|r| r.ticker.as_str()).collect()
    } else {
        primes
    };
    picks.into_iter().take(OPTIONS_DIGEST_SIZE).collect()
}

pub fn options(rows: &[OptionsRow], file_name: &str) -> String {
    format!(
        "🚀 Whale Scan Complete!\n\nTop Picks: {}\n\nFull ranking saved to {}.",
        escape_markdown(&options_picks(rows).join(", ")),
        escape_markdown(file_name)
    )
}

pub fn pullback(rows: &[PullbackRow], file_name: &str) -> String {
    let mut msg = format!("🐋 Pullback Scan: {} candidates\n", rows.len());
    for row in rows.iter().take(OPTIONS_DIGEST_SIZE) {
        let marker = if row.status == PullbackStatus::Prime { "🔥" } else { "👀" };
        msg.push_str(&format!(
            "{} {} | PoP: {}% | RSI: {}\n",
            marker,
            escape_markdown(&row.ticker),
            row.pop,
            row.rsi
        ));
    }
    msg.push_str(&format!("\nSaved to {}.", escape_markdown(file_name)));
    msg
}

pub fn fundamentals(rows: &[FundamentalRow]) -> String {
    let mut msg = String::from("🚀 *WEEKLY WHALE SCAN COMPLETE*\n\n");
    for row in rows.iter().take(FUNDAMENTALS_DIGEST_SIZE) {
        msg.push_str(&format!(
            "🔥 *{}* | Upside: {}% | ROE: {}%\n",
            escape_markdown(&row.ticker),
            row.upside,
            row.roe
        ));
    }
    msg.push_str("\n📊 _Full CSVs written to the output directory._");
    msg
}

pub fn ranking(rows: &[RankingRow]) -> String {
    let mut msg = String::from("🏆 Global Whale Rankings\n\n");
    for row in rows.iter().take(OPTIONS_DIGEST_SIZE) {
        msg.push_str(&format!(
            "#{} {} | Quality: {} | CAGR: {}%\n",
            row.global_rank,
            escape_markdown(&row.ticker),
            row.quality_score,
            row.cagr
        ));
    }
    msg
}
