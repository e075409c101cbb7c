pub mod analysis;
pub mod api;
pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod tickers;
pub mod utils;
