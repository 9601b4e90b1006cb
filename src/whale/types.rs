use serde::Serialize;

/// Detector output for a single candle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WhaleBar {
    pub open_time: i64,
    pub close: f64,
    pub volume: f64,
    pub vma: Option<f64>,
    pub whale_volume: bool,
    pub price_change: Option<f64>,
    pub whale_price: bool,
    pub whale: bool,
    pub is_whale: bool,
}

impl WhaleBar {
    /// Quote-currency value traded in the bar.
    pub fn usd_volume(&self) -> f64 {
        self.volume * self.close
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DetectionSummary {
    pub mean_vma: Option<f64>,
    pub max_volume: f64,
    pub max_price_change: Option<f64>,
    pub whale_volume_count: usize,
    pub whale_price_count: usize,
    pub whale_count: usize,
    pub is_whale_count: usize,
}
