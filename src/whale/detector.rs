use log::info;

use super::{
    config::DetectorConfig,
    types::{DetectionSummary, WhaleBar},
};
use crate::market::Candle;

/// Flags bars whose volume and price move both spike, and that echo an
/// earlier spike one, two or three lookbacks ago.
#[derive(Clone, Debug)]
pub struct WhaleDetector {
    config: DetectorConfig,
}

impl WhaleDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, candles: &[Candle]) -> Vec<WhaleBar> {
        let (magnitude, length) = self.config.magnitude_and_length();
        let vma = rolling_mean(candles, length);

        let mut bars: Vec<WhaleBar> = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let whale_volume = vma[i].map_or(false, |avg| candle.volume >= magnitude * avg);
                let price_change = price_change(candles, i);
                let whale_price = price_change.map_or(false, |change| change >= self.config.price_change_threshold);
                WhaleBar {
                    open_time: candle.open_time,
                    close: candle.close,
                    volume: candle.volume,
                    vma: vma[i],
                    whale_volume,
                    price_change,
                    whale_price,
                    whale: whale_volume && whale_price,
                    is_whale: false,
                }
            })
            .collect();

        let whale: Vec<bool> = bars.iter().map(|bar| bar.whale).collect();
        for (i, bar) in bars.iter_mut().enumerate() {
            let echoed = self.config.lookbacks.iter().any(|&k| self.echo(&whale, i, k));
            bar.is_whale = bar.whale && echoed;
        }

        bars
    }

    fn echo(&self, whale: &[bool], i: usize, k: usize) -> bool {
        let at = |offset: usize| i.checked_sub(offset).map_or(false, |j| whale[j]);
        if at(k) {
            return true;
        }
        self.config.drift && ((k > 0 && at(k - 1)) || at(k + 1))
    }

    pub fn summarize(bars: &[WhaleBar]) -> DetectionSummary {
        let vmas: Vec<f64> = bars.iter().filter_map(|bar| bar.vma).collect();
        let mean_vma = if vmas.is_empty() {
            None
        } else {
            Some(vmas.iter().sum::<f64>() / vmas.len() as f64)
        };

        DetectionSummary {
            mean_vma,
            max_volume: bars.iter().map(|bar| bar.volume).fold(0.0, f64::max),
            max_price_change: bars
                .iter()
                .filter_map(|bar| bar.price_change)
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v)))),
            whale_volume_count: bars.iter().filter(|bar| bar.whale_volume).count(),
            whale_price_count: bars.iter().filter(|bar| bar.whale_price).count(),
            whale_count: bars.iter().filter(|bar| bar.whale).count(),
            is_whale_count: bars.iter().filter(|bar| bar.is_whale).count(),
        }
    }

    /// Run the detector and log its summary.
    pub fn detect_and_log(&self, candles: &[Candle]) -> Vec<WhaleBar> {
        let bars = self.detect(candles);
        let summary = Self::summarize(&bars);
        info!("Average volume (VMA): {:?}", summary.mean_vma);
        info!("Max volume: {}", summary.max_volume);
        info!("Max price change: {:?}", summary.max_price_change);
        info!("Rows with whale_volume=True: {}", summary.whale_volume_count);
        info!("Rows with whale_price=True: {}", summary.whale_price_count);
        info!("Rows with whale=True: {}", summary.whale_count);
        info!("Whale events detected: {}", summary.is_whale_count);
        bars
    }
}

fn rolling_mean(candles: &[Candle], length: usize) -> Vec<Option<f64>> {
    if length == 0 {
        return vec![None; candles.len()];
    }
    let mut out = Vec::with_capacity(candles.len());
    let mut sum = 0.0;
    for (i, candle) in candles.iter().enumerate() {
        sum += candle.volume;
        if i >= length {
            sum -= candles[i - length].volume;
        }
        out.push(if i + 1 >= length { Some(sum / length as f64) } else { None });
    }
    out
}

fn price_change(candles: &[Candle], i: usize) -> Option<f64> {
    let prev = candles.get(i.checked_sub(1)?)?.close;
    if prev == 0.0 {
        return None;
    }
    Some((candles[i].close / prev - 1.0).abs())
}
