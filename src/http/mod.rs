mod cache;
mod client;
mod error;
mod retry;
mod signer;
mod types;

pub use cache::ResponseCache;
pub use client::{decode_body, FetchJson, HttpClient};
#[cfg(test)]
pub use client::MockFetchJson;
pub use error::{FetchError, FetchErrorType};
pub use retry::{RetryConfig, RetryHandler};
pub use signer::BinanceSigner;
pub use types::ApiRequest;
