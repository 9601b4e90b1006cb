//! WhaleScope data layer: market, ETF and staking reports for the desktop
//! shell, printed as JSON.

pub mod app_config;
pub mod dates;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod logging;
pub mod market;
pub mod reports;
pub mod sources;
pub mod storage;
pub mod whale;

pub use app_config::{ApiKeys, AppConfig};
pub use error::{Result, WhaleScopeError};
