//! Composite scores, ranking and status classification

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{FundamentalRow, PullbackStatus, SectorSummaryRow, Status, Trend};
use crate::utils::round2;

/// Low RSI and high probability of profit both push the score up
pub fn match_score(rsi: f64, pop: f64) -> f64 {
    round2((100.0 - rsi) + pop)
}

/// Quality of a fundamentals row: profitability plus valuation upside
pub fn fundamental_quality(roe_pct: f64, upside_pct: f64) -> f64 {
    round2(roe_pct + upside_pct)
}

/// Growth, profitability and income minus a valuation penalty.
/// All inputs are fractions except `forward_pe`.
pub fn ranking_quality(revenue_growth: f64, roe: f64, dividend_yield: f64, forward_pe: f64) -> f64 {
    round2(revenue_growth * 100.0 + roe * 100.0 + dividend_yield * 200.0 - forward_pe / 5.0)
}

/// Stable sort by descending key, then truncate to `top_n`.
/// Non-finite keys sort after every finite one.
pub fn rank_descending<T, F>(mut rows: Vec<T>, key: F, top_n: Option<usize>) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    rows.sort_by(|a, b| compare_desc(key(a), key(b)));
    if let Some(n) = top_n {
        rows.truncate(n);
    }
    rows
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => b.total_cmp(&a),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

/// Values a status rule can look at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusInputs {
    pub pop: f64,
    pub rsi: f64,
    pub trend: Trend,
}

/// One threshold rule: when `applies` holds the row takes `status`
#[derive(Debug, Clone)]
pub struct StatusRule {
    pub name: &'static str,
    pub status: Status,
    pub applies: fn(&StatusInputs) -> bool,
}

/// Ordered rule set. Every rule is evaluated and the last matching one wins,
/// so later rules take precedence over earlier ones when they overlap.
#[derive(Debug, Clone)]
pub struct StatusRules {
    pub default: Status,
    pub rules: Vec<StatusRule>,
}

impl StatusRules {
    /// WATCH unless prime; any downtrend is RISKY regardless of what matched before.
    pub fn options_screen() -> Self {
        Self {
            default: Status::Watch,
            rules: vec![
                StatusRule {
                    name: "prime",
                    status: Status::Prime,
                    applies: |i| i.pop >= 80.0 && i.rsi <= 45.0 && i.trend == Trend::Bull,
                },
                StatusRule {
                    name: "downtrend",
                    status: Status::Risky,
                    applies: |i| i.trend == Trend::Bear,
                },
            ],
        }
    }

    pub fn classify(&self, inputs: &StatusInputs) -> Status {
        self.rules
            .iter()
            .filter(|rule| (rule.applies)(inputs))
            .last()
            .map(|rule| rule.status)
            .unwrap_or(self.default)
    }
}

impl Default for StatusRules {
    fn default() -> Self {
        Self::options_screen()
    }
}

/// Pullback candidates are already in an uptrend, so only two buckets apply
pub fn pullback_status(pop: f64, rsi: f64) -> PullbackStatus {
    if pop > 80.0 && rsi < 40.0 {
        PullbackStatus::Prime
    } else {
        PullbackStatus::Watch
    }
}

/// Average upside and ROE per sector, in sector name order
pub fn summarize_sectors(rows: &[FundamentalRow]) -> Vec<SectorSummaryRow> {
    let mut groups: BTreeMap<&str, (f64, f64, usize)> = BTreeMap::new();
    for row in rows {
        let entry = groups.entry(row.sector.as_str()).or_insert((0.0, 0.0, 0));
        entry.0 += row.upside;
        entry.1 += row.roe;
        entry.2 += 1;
    }

    groups
        .into_iter()
        .map(|(sector, (upside, roe, count))| SectorSummaryRow {
            sector: sector.to_string(),
            avg_upside: round2(upside / count as f64),
            avg_roe: round2(roe / count as f64),
            count,
        })
        .collect()
}
