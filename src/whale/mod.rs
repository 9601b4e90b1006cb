mod config;
mod detector;
mod types;

pub use config::{DetectorConfig, Timeframe};
pub use detector::WhaleDetector;
pub use types::{DetectionSummary, WhaleBar};
