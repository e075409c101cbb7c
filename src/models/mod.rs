use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Ticker symbol in the form the market-data provider expects
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticker(String);

impl Ticker {
    /// Build a ticker from a raw symbol, trimming whitespace and replacing
    /// `.` with `-` (`BRK.B` becomes `BRK-B`)
    pub fn new(raw: &str) -> Self {
        Ticker(raw.trim().replace('.', "-").to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(raw: &str) -> Self {
        Ticker::new(raw)
    }
}

/// One daily sample of a price series
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Date-ascending price history for one ticker
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Bars are sorted by date on construction; duplicate dates keep the last sample.
    pub fn new(mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by(|later, earlier| {
            if later.date == earlier.date {
                *earlier = later.clone();
                true
            } else {
                false
            }
        });
        Self { bars }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    pub fn first_close(&self) -> Option<f64> {
        self.bars.first().map(|b| b.close)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.bars.last().map(|b| b.close)
    }

    /// The most recent `n` samples (or all of them when shorter)
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}

/// Metadata snapshot for a ticker. Every field is optional because the
/// provider omits whatever it does not have for a given symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub short_name: Option<String>,
    pub sector: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub implied_volatility: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub beta: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub forward_pe: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

/// Option contract row, only the fields the unusual-activity check reads
#[derive(Debug, Clone, PartialEq)]
pub struct PutContract {
    pub strike: f64,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
}

/// Price relative to the 200-sample moving average
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bull,
    Bear,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Bull => "BULL",
            Trend::Bear => "BEAR",
        }
    }
}

impl Serialize for Trend {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Coarse classification written into the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Prime,
    Watch,
    Risky,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Prime => "PRIME",
            Status::Watch => "WATCH",
            Status::Risky => "RISKY (Downtrend)",
        }
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Volume of the latest sample versus its trailing average
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFlag {
    Elevated,
    Normal,
}

impl Serialize for VolumeFlag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            VolumeFlag::Elevated => "ELEVATED",
            VolumeFlag::Normal => "NORMAL",
        })
    }
}

/// Technical metrics shared by the options-oriented scans
#[derive(Debug, Clone, PartialEq)]
pub struct TechnicalMetrics {
    pub price: f64,
    pub sma200: f64,
    pub rsi: f64,
    pub whale_support: f64,
    pub implied_volatility: f64,
    pub target_strike: f64,
    pub pop: f64,
    pub trend: Trend,
    pub volume_flag: VolumeFlag,
}

/// Row of the options whale screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "RSI")]
    pub rsi: f64,
    #[serde(rename = "Whale_Support")]
    pub whale_support: f64,
    #[serde(rename = "PoP_%")]
    pub pop: f64,
    #[serde(rename = "Match_Score")]
    pub match_score: f64,
    #[serde(rename = "Trend")]
    pub trend: Trend,
    #[serde(rename = "Volume_Spike")]
    pub volume_flag: VolumeFlag,
    #[serde(rename = "Status")]
    pub status: Status,
}

/// Unusual put activity on the nearest expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutActivity {
    Unusual,
    Quiet,
    Unknown,
}

impl Serialize for PutActivity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            PutActivity::Unusual => "YES",
            PutActivity::Quiet => "No",
            PutActivity::Unknown => "N/A",
        })
    }
}

/// Status used by the pullback scan, which has no downtrend bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullbackStatus {
    Prime,
    Watch,
}

impl Serialize for PullbackStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            PullbackStatus::Prime => "PRIME",
            PullbackStatus::Watch => "Watch",
        })
    }
}

/// Row of the uptrend-pullback scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullbackRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "RSI")]
    pub rsi: f64,
    #[serde(rename = "Whale_Support")]
    pub whale_support: f64,
    #[serde(rename = "Target_Strike")]
    pub target_strike: f64,
    #[serde(rename = "PoP_%")]
    pub pop: f64,
    #[serde(rename = "IV_%")]
    pub iv_percent: f64,
    #[serde(rename = "UOA")]
    pub put_activity: PutActivity,
    #[serde(rename = "Match_Score")]
    pub match_score: f64,
    #[serde(rename = "Status")]
    pub status: PullbackStatus,
}

/// Row of the fundamentals (fair value) scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Fair_Value")]
    pub fair_value: f64,
    #[serde(rename = "Upside_%")]
    pub upside: f64,
    #[serde(rename = "Stop_Loss")]
    pub stop_loss: f64,
    #[serde(rename = "Target_Sell")]
    pub target_sell: f64,
    #[serde(rename = "ROE_%")]
    pub roe: f64,
    #[serde(rename = "Rev_Growth_%")]
    pub revenue_growth: f64,
    #[serde(rename = "Trap_Warning", serialize_with = "yes_no")]
    pub trap: bool,
    #[serde(rename = "Dividend_Yield_%")]
    pub dividend_yield: f64,
    #[serde(rename = "Quality_Score")]
    pub quality_score: f64,
}

/// Per-sector averages over the fundamentals scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorSummaryRow {
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Avg_Upside_%")]
    pub avg_upside: f64,
    #[serde(rename = "Avg_ROE_%")]
    pub avg_roe: f64,
    #[serde(rename = "Count")]
    pub count: usize,
}

/// Row of the multi-year quality ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingRow {
    #[serde(rename = "Global_Rank")]
    pub global_rank: usize,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Quality_Score")]
    pub quality_score: f64,
    #[serde(rename = "CAGR_%")]
    pub cagr: f64,
    #[serde(rename = "Total_Return_%")]
    pub total_return: f64,
    #[serde(rename = "Growth_of_10k")]
    pub growth_of_10k: f64,
    #[serde(rename = "Div_Yield_%")]
    pub dividend_yield: f64,
    #[serde(rename = "Forward_PE")]
    pub forward_pe: f64,
}

fn yes_no<S: serde::Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *flag { "YES" } else { "NO" })
}

/// Telegram bot credentials
#[derive(Debug, Clone, PartialEq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

/// Twilio WhatsApp credentials
#[derive(Debug, Clone, PartialEq)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub to_number: String,
    pub from_number: String,
}

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_SP500_TABLE_URL: &str = "https://en.wikipedia.org/wiki/List_of_S%26P_500_companies";
pub const DEFAULT_WHATSAPP_FROM: &str = "whatsapp:+14155238886";
pub const DEFAULT_TELEGRAM_BASE_URL: &str = "https://api.telegram.org";
pub const DEFAULT_TWILIO_BASE_URL: &str = "https://api.twilio.com";

/// Configuration for the application. Populated once at startup and
/// handed to the provider, ticker source and notifiers by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: Option<TelegramCredentials>,
    pub twilio: Option<TwilioCredentials>,
    pub yahoo_base_url: String,
    pub sp500_table_url: String,
    pub telegram_base_url: String,
    pub twilio_base_url: String,
    pub output_dir: PathBuf,
    pub request_delay_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram: None,
            twilio: None,
            yahoo_base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            sp500_table_url: DEFAULT_SP500_TABLE_URL.to_string(),
            telegram_base_url: DEFAULT_TELEGRAM_BASE_URL.to_string(),
            twilio_base_url: DEFAULT_TWILIO_BASE_URL.to_string(),
            output_dir: PathBuf::from("."),
            request_delay_ms: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let telegram = match (get("TELEGRAM_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramCredentials { bot_token, chat_id }),
            _ => None,
        };

        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("MY_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(to_number)) => Some(TwilioCredentials {
                account_sid,
                auth_token,
                to_number,
                from_number: get("TWILIO_WHATSAPP_FROM")
                    .unwrap_or_else(|| DEFAULT_WHATSAPP_FROM.to_string()),
            }),
            _ => None,
        };

        // A bad tuning value falls back to each scan's own delay
        let request_delay_ms = get("SCAN_DELAY_MS").and_then(|raw| match raw.parse::<u64>() {
            Ok(ms) => Some(ms),
            Err(_) => {
                warn!("Ignoring SCAN_DELAY_MS={:?}: expected whole milliseconds", raw);
                None
            }
        });

        let defaults = Config::default();
        Ok(Config {
            telegram,
            twilio,
            yahoo_base_url: get("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            sp500_table_url: get("SP500_TABLE_URL").unwrap_or(defaults.sp500_table_url),
            telegram_base_url: get("TELEGRAM_BASE_URL").unwrap_or(defaults.telegram_base_url),
            twilio_base_url: get("TWILIO_BASE_URL").unwrap_or(defaults.twilio_base_url),
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
            request_delay_ms,
        })
    }
}
