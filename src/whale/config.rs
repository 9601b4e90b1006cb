use std::fmt;
use std::str::FromStr;

use crate::error::WhaleScopeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    OneHour,
    FourHours,
}

impl Timeframe {
    /// Binance kline interval name.
    pub fn as_interval(&self) -> &'static str {
        match self {
            Timeframe::OneHour => "1h",
            Timeframe::FourHours => "4h",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_interval())
    }
}

impl FromStr for Timeframe {
    type Err = WhaleScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Timeframe::OneHour),
            "4h" => Ok(Timeframe::FourHours),
            other => Err(WhaleScopeError::UnsupportedTimeframe(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    pub timeframe: Timeframe,
    pub magnitude_1h: f64,
    pub length_1h: usize,
    pub magnitude_4h: f64,
    pub length_4h: usize,
    /// Minimum absolute bar-over-bar close change.
    pub price_change_threshold: f64,
    /// Also accept a whale bar one step either side of each lookback.
    pub drift: bool,
    pub lookbacks: Vec<usize>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::OneHour,
            magnitude_1h: 1.2,
            length_1h: 24,
            magnitude_4h: 2.0,
            length_4h: 12,
            price_change_threshold: 0.005,
            drift: false,
            lookbacks: vec![24, 48, 72],
        }
    }
}

impl DetectorConfig {
    pub fn with_drift(mut self, drift: bool) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Volume multiple and moving-average window for the configured timeframe.
    pub fn magnitude_and_length(&self) -> (f64, usize) {
        match self.timeframe {
            Timeframe::OneHour => (self.magnitude_1h, self.length_1h),
            Timeframe::FourHours => (self.magnitude_4h, self.length_4h),
        }
    }
}
