use thiserror::Error;

/// Reason a single ticker produced no report row
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("insufficient history: {available} samples, need {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("missing data: {0}")]
    MissingData(&'static str),

    #[error("invalid price {0}")]
    InvalidPrice(f64),
}

impl From<anyhow::Error> for ScanError {
    fn from(err: anyhow::Error) -> Self {
        ScanError::Fetch(format!("{:#}", err))
    }
}
