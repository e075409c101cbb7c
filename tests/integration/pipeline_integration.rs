//! Full runs over an in-memory provider: scan, rank, write, notify

use pretty_assertions::assert_eq;
use std::path::Path;
use test_log::test;

use whale_screener::models::PutContract;
use whale_screener::notify::NotificationHub;
use whale_screener::pipeline::{Pipeline, RunSettings};
use whale_screener::report::{FUNDAMENTALS_REPORT, OPTIONS_REPORT, RANKING_REPORT, SECTOR_REPORT};
use whale_screener::scanner::{FundamentalScreen, OptionsScreen, PullbackScreen, QualityRanking, ScanSummary};
use whale_screener::tickers::TickerSource;

use crate::common::{fixtures, logging, RecordingNotifier, StaticProvider};

const BEARS: [&str; 4] = ["DDD", "EEE", "FFF", "GGG"];

/// Three uptrend pullbacks and four names in a downtrend
fn seven_ticker_provider() -> StaticProvider {
    let mut provider = StaticProvider::new()
        .with_history("AAA", fixtures::pullback_series(0.4))
        .with_snapshot("AAA", fixtures::snapshot_with_iv(0.05))
        .with_puts(
            "AAA",
            vec![PutContract { strike: 140.0, volume: Some(500), open_interest: Some(100) }],
        )
        .with_history("BBB", fixtures::pullback_series(0.6))
        .with_snapshot("BBB", fixtures::snapshot_with_iv(0.05))
        .with_puts(
            "BBB",
            vec![PutContract { strike: 140.0, volume: Some(10), open_interest: Some(100) }],
        )
        .with_history("CCC", fixtures::pullback_series(0.4))
        .with_snapshot("CCC", fixtures::snapshot_with_iv(2.0));
    for symbol in BEARS {
        provider = provider.with_history(symbol, fixtures::downtrend_series());
    }
    provider
}

fn seven_tickers() -> TickerSource {
    TickerSource::from_symbols(&["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG"])
}

fn settings(dir: &Path) -> RunSettings {
    RunSettings {
        output_dir: dir.to_path_buf(),
        delay_ms: Some(0),
        notify: true,
    }
}

fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[test(tokio::test)]
async fn test_pullback_run_end_to_end() {
    logging::log_test_step("Pullback scan over seven tickers");
    let dir = tempfile::tempdir().unwrap();
    let provider = seven_ticker_provider();
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);

    let output = Pipeline::new(&provider, &hub, settings(dir.path()))
        .run_pullback(&PullbackScreen::default(), &seven_tickers())
        .await
        .unwrap();

    assert_eq!(
        output.summary,
        ScanSummary { total: 7, scanned: 3, filtered: 4, failed: 0 }
    );
    assert_eq!(output.notified, 1);

    let (headers, rows) = read_csv(&dir.path().join(OPTIONS_REPORT));
    assert_eq!(
        headers,
        vec!["Ticker", "Price", "RSI", "Whale_Support", "Target_Strike", "PoP_%", "IV_%", "UOA", "Match_Score", "Status"]
    );
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows[0],
        vec!["AAA", "144.0", "28.57", "122.57", "122.57", "100.0", "5.0", "YES", "171.43", "PRIME"]
    );
    assert_eq!(rows[1][0], "BBB");
    assert_eq!(rows[1][2], "37.5");
    assert_eq!(rows[1][7], "No");
    assert_eq!(rows[1][9], "PRIME");
    assert_eq!(rows[2][0], "CCC");
    assert_eq!(rows[2][7], "N/A");
    assert_eq!(rows[2][9], "Watch");

    // Filtered names never reach the snapshot or option chain lookups
    let requests = provider.requests();
    for symbol in BEARS {
        assert!(requests.contains(&format!("history:{}", symbol)));
        assert!(!requests.contains(&format!("snapshot:{}", symbol)));
    }

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Pullback Scan: 3 candidates"));
    assert!(messages[0].contains("🔥 AAA"));
    assert!(messages[0].contains("👀 CCC"));
}

#[test(tokio::test)]
async fn test_options_run_ranks_and_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let provider = seven_ticker_provider();
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);
    let pipeline = Pipeline::new(&provider, &hub, settings(dir.path()));

    let full = pipeline
        .run_options(&OptionsScreen::default(), &seven_tickers())
        .await
        .unwrap();
    assert_eq!(full.summary.scanned, 7);
    let order: Vec<&str> = full.rows.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(order, vec!["AAA", "BBB", "DDD", "EEE", "FFF", "GGG", "CCC"]);
    for row in full.rows.iter().filter(|r| BEARS.contains(&r.ticker.as_str())) {
        assert_eq!(row.status.label(), "RISKY (Downtrend)");
    }
    assert_eq!(full.rows.last().unwrap().status.label(), "WATCH");

    let strategy = OptionsScreen { top_n: 3, ..OptionsScreen::default() };
    let top = pipeline.run_options(&strategy, &seven_tickers()).await.unwrap();
    let (_, rows) = read_csv(&dir.path().join(OPTIONS_REPORT));
    assert_eq!(top.rows.len(), 3);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], "AAA");
    assert_eq!(rows[0][8], "PRIME");
    assert_eq!(rows[2][0], "DDD");

    // Prime picks are named in the digest
    let messages = recorder.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("Top Picks: AAA, BBB"));
}

#[test(tokio::test)]
async fn test_empty_universe_writes_header_and_alerts() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StaticProvider::new();
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);

    let output = Pipeline::new(&provider, &hub, settings(dir.path()))
        .run_options(&OptionsScreen::default(), &TickerSource::Static(Vec::new()))
        .await
        .unwrap();

    assert_eq!(output.summary, ScanSummary::default());
    let text = std::fs::read_to_string(dir.path().join(OPTIONS_REPORT)).unwrap();
    assert_eq!(text, "Ticker,Price,RSI,Whale_Support,PoP_%,Match_Score,Trend,Volume_Spike,Status\n");

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("No data collected"));
}

#[test(tokio::test)]
async fn test_all_failures_count_as_no_data() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StaticProvider::new();
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);

    let output = Pipeline::new(&provider, &hub, settings(dir.path()))
        .run_pullback(&PullbackScreen::default(), &TickerSource::from_symbols(&["NOPE", "GONE"]))
        .await
        .unwrap();

    assert_eq!(
        output.summary,
        ScanSummary { total: 2, scanned: 0, filtered: 0, failed: 2 }
    );
    assert!(output.rows.is_empty());
    assert!(recorder.messages()[0].contains("pullback"));
}

#[test(tokio::test)]
async fn test_notifications_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let provider = seven_ticker_provider();
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);
    let settings = RunSettings { notify: false, ..settings(dir.path()) };

    let output = Pipeline::new(&provider, &hub, settings)
        .run_pullback(&PullbackScreen::default(), &seven_tickers())
        .await
        .unwrap();

    assert_eq!(output.rows.len(), 3);
    assert_eq!(output.notified, 0);
    assert!(recorder.messages().is_empty());
}

#[test(tokio::test)]
async fn test_fundamentals_run_writes_master_and_sectors() {
    let dir = tempfile::tempdir().unwrap();
    let mut small = fixtures::fundamentals_snapshot("Utilities", 30.0, 2.0, 0.2, 0.05);
    small.market_cap = Some(1.0e9);
    let provider = StaticProvider::new()
        .with_snapshot("TECH1", fixtures::fundamentals_snapshot("Technology", 100.0, 5.0, 0.25, 0.08))
        .with_snapshot("TECH2", fixtures::fundamentals_snapshot("Technology", 50.0, 5.0, 0.40, 0.10))
        .with_snapshot("OIL", fixtures::fundamentals_snapshot("Energy", 80.0, 6.0, 0.05, 0.02))
        .with_snapshot("SMALL", small);
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);

    let output = Pipeline::new(&provider, &hub, settings(dir.path()))
        .run_fundamentals(
            &FundamentalScreen::default(),
            &TickerSource::from_symbols(&["TECH1", "TECH2", "OIL", "SMALL", "MISSING"]),
        )
        .await
        .unwrap();

    assert_eq!(
        output.summary,
        ScanSummary { total: 5, scanned: 3, filtered: 1, failed: 1 }
    );

    let master: Vec<&str> = output.rows.master.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(master, vec!["TECH2", "TECH1"]);
    assert_eq!(output.rows.master[1].quality_score, 31.2);

    let (_, rows) = read_csv(&dir.path().join(FUNDAMENTALS_REPORT));
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r[10] == "NO"));

    // The trap still counts toward its sector
    let (headers, sectors) = read_csv(&dir.path().join(SECTOR_REPORT));
    assert_eq!(headers, vec!["Sector", "Avg_Upside_%", "Avg_ROE_%", "Count"]);
    assert_eq!(sectors.len(), 2);
    assert_eq!(sectors[0][0], "Energy");
    assert_eq!(sectors[1][0], "Technology");
    assert_eq!(sectors[1][3], "2");

    let messages = recorder.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("*TECH2*"));
}

#[test(tokio::test)]
async fn test_fundamentals_without_data_skips_sector_report() {
    let dir = tempfile::tempdir().unwrap();
    let provider = StaticProvider::new();
    let recorder = RecordingNotifier::default();
    let hub = NotificationHub::new(vec![Box::new(recorder.clone())]);

    let output = Pipeline::new(&provider, &hub, settings(dir.path()))
        .run_fundamentals(&FundamentalScreen::default(), &TickerSource::from_symbols(&["MISSING"]))
        .await
        .unwrap();

    assert!(output.rows.master.is_empty());
    assert_eq!(output.reports.len(), 1);
    let text = std::fs::read_to_string(dir.path().join(FUNDAMENTALS_REPORT)).unwrap();
    assert_eq!(text.lines().count(), 1);
    assert!(!dir.path().join(SECTOR_REPORT).exists());
    assert!(recorder.messages()[0].contains("No data collected by the fundamentals scan"));
}

#[test(tokio::test)]
async fn test_ranking_run_numbers_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut quality = fixtures::snapshot_with_iv(0.2);
    quality.return_on_equity = Some(0.5);
    quality.forward_pe = Some(20.0);
    let provider = StaticProvider::new()
        .with_history("LOW", fixtures::linear_series(100.0, 133.1, 30))
        .with_snapshot("LOW", fixtures::snapshot_with_iv(0.2))
        .with_history("HIGH", fixtures::linear_series(100.0, 133.1, 30))
        .with_snapshot("HIGH", quality);
    let hub = NotificationHub::default();

    let output = Pipeline::new(&provider, &hub, settings(dir.path()))
        .run_ranking(&QualityRanking::default(), &TickerSource::from_symbols(&["LOW", "HIGH"]))
        .await
        .unwrap();

    assert_eq!(output.notified, 0);
    assert_eq!(output.rows[0].ticker, "HIGH");
    assert_eq!(output.rows[0].global_rank, 1);
    assert_eq!(output.rows[1].global_rank, 2);
    assert_eq!(output.rows[1].cagr, 10.0);

    let (headers, rows) = read_csv(&dir.path().join(RANKING_REPORT));
    assert_eq!(headers[0], "Global_Rank");
    assert_eq!(rows[0][0], "1");
    assert_eq!(rows[0][1], "HIGH");
}
