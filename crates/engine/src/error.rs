//! Error types for the analysis core and its collaborators

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("insufficient data: {actual} candles, at least {required} required")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Failures fetching candles from a market data provider
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No candles returned for {symbol} {interval}")]
    Empty { symbol: String, interval: String },
}

/// Failures delivering alerts to a notification channel
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected with status {0}")]
    Rejected(u16),

    #[error("Rate limit reached ({0} per minute)")]
    RateLimited(usize),
}
