use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use whale_screener::api::YahooClient;
use whale_screener::models::Config;
use whale_screener::notify::NotificationHub;
use whale_screener::pipeline::{Pipeline, RunSettings};
use whale_screener::scanner::{FundamentalScreen, OptionsScreen, PullbackScreen, QualityRanking};
use whale_screener::tickers::{TickerSource, PULLBACK_UNIVERSE, RANKING_WATCHLIST};

/// Daily and weekly whale scans over US equities
#[derive(Parser)]
#[command(name = "whale-screener")]
#[command(version = "0.1.0")]
#[command(about = "Screen tickers, rank them, write a CSV report and send an alert digest")]
#[command(long_about = "
Fetches price history and fundamentals per ticker, computes trend, RSI,
volume-at-price support and probability of profit, ranks the results and
writes a CSV report. An optional digest goes to Telegram and/or WhatsApp
when credentials are present in the environment (or a .env file).

Examples:
  whale-screener options                       # S&P 500 options whale screen
  whale-screener pullback --tickers AAPL,MSFT  # uptrend pullbacks in a custom list
  whale-screener fundamentals --no-notify      # weekly fair value scan
  whale-screener rank --output-dir reports     # 3-year quality ranking
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Options whale screen: RSI, whale support and probability of profit
    Options {
        #[command(flatten)]
        run: RunArgs,

        /// Keep at most this many rows in the report
        #[arg(long, default_value_t = 20)]
        top_n: usize,
    },
    /// Uptrend names in a pullback, with unusual put activity
    Pullback {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Large-cap fair value and quality scan with sector summary
    Fundamentals {
        #[command(flatten)]
        run: RunArgs,

        /// Keep at most this many rows in the master list
        #[arg(long, default_value_t = 30)]
        top_n: usize,
    },
    /// Three-year CAGR and quality ranking of a watchlist
    Rank {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Send a test message through every configured notifier
    TestNotify,
}

#[derive(Args)]
struct RunArgs {
    /// Comma-separated tickers instead of the scan's default universe
    #[arg(long, value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// Directory the CSV reports are written to
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Delay between tickers in milliseconds
    #[arg(long, short = 'd')]
    delay_ms: Option<u64>,

    /// Skip the alert digest
    #[arg(long)]
    no_notify: bool,
}

impl RunArgs {
    fn settings(&self, config: &Config) -> RunSettings {
        RunSettings {
            output_dir: self.output_dir.clone().unwrap_or_else(|| config.output_dir.clone()),
            delay_ms: self.delay_ms.or(config.request_delay_ms),
            notify: !self.no_notify,
        }
    }

    fn source(&self, default: TickerSource) -> TickerSource {
        match &self.tickers {
            Some(symbols) => TickerSource::from_symbols(symbols),
            None => default,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("whale_screener=info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };

    let hub = NotificationHub::from_config(&config);
    if hub.is_empty() {
        info!("📋 No messaging credentials configured; alerts will be skipped");
    } else {
        info!("📋 Alerts enabled via {}", hub.names().join(", "));
    }

    let provider = YahooClient::new(&config)?;

    match cli.command {
        Command::Options { run, top_n } => {
            info!("Starting S&P 500 Whale Scan...");
            let pipeline = Pipeline::new(&provider, &hub, run.settings(&config));
            let strategy = OptionsScreen {
                top_n,
                ..OptionsScreen::default()
            };
            let output = pipeline
                .run_options(&strategy, &run.source(TickerSource::sp500(&config)))
                .await?;
            println!("Scan Complete! Top {} ranking saved.", output.rows.len());
        }
        Command::Pullback { run } => {
            let pipeline = Pipeline::new(&provider, &hub, run.settings(&config));
            let output = pipeline
                .run_pullback(
                    &PullbackScreen::default(),
                    &run.source(TickerSource::from_symbols(PULLBACK_UNIVERSE)),
                )
                .await?;
            println!("Success! {} candidates saved.", output.rows.len());
        }
        Command::Fundamentals { run, top_n } => {
            info!("🐋 Starting Ultimate Whale Master...");
            let pipeline = Pipeline::new(&provider, &hub, run.settings(&config));
            let strategy = FundamentalScreen {
                top_n,
                ..FundamentalScreen::default()
            };
            let output = pipeline
                .run_fundamentals(&strategy, &run.source(TickerSource::sp500(&config)))
                .await?;
            println!(
                "{} names in the master list across {} sectors.",
                output.rows.master.len(),
                output.rows.sectors.len()
            );
        }
        Command::Rank { run } => {
            let pipeline = Pipeline::new(&provider, &hub, run.settings(&config));
            let output = pipeline
                .run_ranking(
                    &QualityRanking::default(),
                    &run.source(TickerSource::from_symbols(RANKING_WATCHLIST)),
                )
                .await?;

            println!("\n🏆 TOP 10 RANKED CANDIDATES:");
            println!("{:<5} {:<7} {:>13} {:>8} {:>14}", "Rank", "Ticker", "Quality_Score", "CAGR_%", "Growth_of_10k");
            for row in output.rows.iter().take(10) {
                println!(
                    "{:<5} {:<7} {:>13.2} {:>8.2} {:>14.2}",
                    row.global_rank, row.ticker, row.quality_score, row.cagr, row.growth_of_10k
                );
            }
        }
        Command::TestNotify => {
            let delivered = hub.broadcast("✅ Test from whale-screener!").await;
            println!("Delivered to {} of {} notifiers", delivered, hub.names().len());
        }
    }

    Ok(())
}
