use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Rate limit reached (429) for {url}")]
    RateLimited { url: String },

    #[error("Server error {status} from {url}")]
    ServerError { url: String, status: u16 },

    #[error("Request error: {status} - {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout error after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(&'static str),

    #[error("Signing failed: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorType {
    RateLimited,
    ServerError,
    Status,
    Transport,
    Timeout,
    InvalidResponse,
    Api,
    MissingApiKey,
    Signing,
}

impl FetchError {
    pub fn error_type(&self) -> FetchErrorType {
        match self {
            FetchError::RateLimited { .. } => FetchErrorType::RateLimited,
            FetchError::ServerError { .. } => FetchErrorType::ServerError,
            FetchError::Status { .. } => FetchErrorType::Status,
            FetchError::Transport(_) => FetchErrorType::Transport,
            FetchError::Timeout(_) => FetchErrorType::Timeout,
            FetchError::InvalidResponse(_) => FetchErrorType::InvalidResponse,
            FetchError::Api(_) => FetchErrorType::Api,
            FetchError::MissingApiKey(_) => FetchErrorType::MissingApiKey,
            FetchError::Signing(_) => FetchErrorType::Signing,
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(url: &str, status: u16, body: String) -> Self {
        match status {
            429 => FetchError::RateLimited { url: url.to_string() },
            500..=599 => FetchError::ServerError {
                url: url.to_string(),
                status,
            },
            _ => FetchError::Status {
                url: url.to_string(),
                status,
                body,
            },
        }
    }

    /// Classify a reqwest failure; `timeout` is the limit the client was built with.
    pub fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            FetchError::Timeout(timeout)
        } else if error.is_decode() {
            FetchError::InvalidResponse(error.to_string())
        } else {
            FetchError::Transport(error.to_string())
        }
    }
}


impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::InvalidResponse(error.to_string())
    }
}
