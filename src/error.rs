use thiserror::Error;

use crate::http::FetchError;

#[derive(Error, Debug)]
pub enum WhaleScopeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: String, end: String },

    #[error("Only '1h' and '4h' timeframes are supported, got '{0}'")]
    UnsupportedTimeframe(String),

    #[error("{0}")]
    Report(String),
}

pub type Result<T> = std::result::Result<T, WhaleScopeError>;
