use futures::future::join_all;
use log::{error, info};
use serde::Serialize;

use super::ReportContext;
use crate::error::Result;
use crate::market::Candle;

const PAIRS: [(&str, &str); 10] = [
    ("BTC", "yellow"),
    ("ETH", "aqua"),
    ("XRP", "blue"),
    ("BNB", "magenta"),
    ("SOL", "green"),
    ("DOGE", "lime"),
    ("ADA", "maroon"),
    ("TRX", "silver"),
    ("LINK", "olive"),
    ("AVAX", "orange"),
];
const CANDLE_LIMIT: u32 = 100;
const VOLUME_SCALE: f64 = 360.0;
const DELTA_SCALE: f64 = 100.0;

/// One slice of the volume/volatility polar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolarEntry {
    pub symbol: String,
    pub color: String,
    /// Summed `volume * close` in USDT.
    pub cum_vol: f64,
    /// Summed `|close - open| / open`.
    pub cum_delta: f64,
    pub norm_vol: f64,
    pub norm_delta: f64,
    pub area: f64,
    pub percent: f64,
}

pub async fn polar_report(ctx: &ReportContext) -> Result<Vec<PolarEntry>> {
    let binance = ctx.binance();
    let fetches = PAIRS.iter().map(|(base, _)| {
        let binance = &binance;
        async move {
            let symbol = format!("{}USDT", base);
            binance.klines(&symbol, "1d", None, None, CANDLE_LIMIT).await
        }
    });
    let results = join_all(fetches).await;

    let totals: Vec<(f64, f64)> = PAIRS
        .iter()
        .zip(results)
        .map(|((base, _), result)| match result {
            Ok(candles) => cumulative(&candles),
            Err(e) => {
                error!("Failed to fetch {}/USDT candles: {}", base, e);
                (0.0, 0.0)
            }
        })
        .collect();

    let entries = polar_entries(&totals);
    info!("Polar data generated for {} pairs", entries.len());
    Ok(entries)
}

fn cumulative(candles: &[Candle]) -> (f64, f64) {
    candles.iter().fold((0.0, 0.0), |(vol, delta), candle| {
        let move_ratio = if candle.open != 0.0 {
            (candle.close - candle.open).abs() / candle.open
        } else {
            0.0
        };
        (vol + candle.volume * candle.close, delta + move_ratio)
    })
}

/// Scale so the values sum to `scale`; all zeros stay zero.
fn normalize(values: &[f64], scale: f64) -> Vec<f64> {
    let sum: f64 = values.iter().sum();
    if sum == 0.0 {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / (sum / scale)).collect()
}

fn polar_entries(totals: &[(f64, f64)]) -> Vec<PolarEntry> {
    let vols: Vec<f64> = totals.iter().map(|(vol, _)| *vol).collect();
    let deltas: Vec<f64> = totals.iter().map(|(_, delta)| *delta).collect();
    let norm_vols = normalize(&vols, VOLUME_SCALE);
    let norm_deltas = normalize(&deltas, DELTA_SCALE);
    let areas: Vec<f64> = totals.iter().map(|(vol, delta)| vol * delta).collect();
    let total_area: f64 = areas.iter().sum();

    PAIRS
        .iter()
        .enumerate()
        .take(totals.len())
        .map(|(i, (base, color))| PolarEntry {
            symbol: format!("{}/USDT", base),
            color: color.to_string(),
            cum_vol: vols[i],
            cum_delta: deltas[i],
            norm_vol: norm_vols[i],
            norm_delta: norm_deltas[i],
            area: areas[i],
            percent: if total_area > 0.0 { areas[i] / total_area * 100.0 } else { 0.0 },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::ApiKeys;
    use crate::reports::testing;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_sums_to_scale() {
        let normalized = normalize(&[1.0, 3.0], 360.0);
        assert!((normalized[0] - 90.0).abs() < 1e-9);
        assert!((normalized.iter().sum::<f64>() - 360.0).abs() < 1e-9);
        assert_eq!(normalize(&[0.0, 0.0], 100.0), vec![0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_failed_pairs_are_zeroed() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |req| {
            assert_eq!(req.params["limit"], "100");
            match req.params["symbol"].as_str() {
                // |110 - 100| / 100 = 0.1 per day, 10 * 110 USDT volume
                "BTCUSDT" | "ETHUSDT" => Some(json!([
                    [0, "100", "111", "99", "110", "10", 0, "0", 0, "0", "0", "0"],
                    [86400000, "100", "111", "99", "110", "10", 0, "0", 0, "0", "0", "0"]
                ])),
                _ => None,
            }
        });

        let entries = polar_report(&ctx).await.unwrap();

        assert_eq!(entries.len(), 10);
        assert_eq!(entries[0].symbol, "BTC/USDT");
        assert_eq!(entries[0].color, "yellow");
        assert_eq!(entries[0].cum_vol, 2_200.0);
        assert!((entries[0].cum_delta - 0.2).abs() < 1e-12);
        assert!((entries[0].norm_vol - 180.0).abs() < 1e-9);
        assert_eq!(entries[0].percent, 50.0);
        assert_eq!(entries[9].symbol, "AVAX/USDT");
        assert_eq!(entries[9].cum_vol, 0.0);
        assert_eq!(entries[9].percent, 0.0);
    }
}
