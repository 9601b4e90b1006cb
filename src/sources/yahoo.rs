use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::field_f64;
use crate::dates::{from_unix_secs, DateRange, DATE_FORMAT};
use crate::http::{ApiRequest, FetchError, FetchJson};
use crate::market::value_f64;

pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub price: f64,
    pub volume: u64,
}

/// Latest quote plus short-horizon changes derived from daily closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteStats {
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub percent_change_24h: f64,
    pub percent_change_7d: f64,
}

pub struct YahooClient {
    base_url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl YahooClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            base_url: YAHOO_CHART_URL.to_string(),
            fetcher,
        }
    }

    async fn chart(&self, request: ApiRequest, ticker: &str) -> Result<Value, FetchError> {
        let data = self.fetcher.get_json(request).await?;
        data.pointer("/chart/result/0").cloned().ok_or_else(|| {
            let reason = data
                .pointer("/chart/error/description")
                .and_then(Value::as_str)
                .unwrap_or("empty chart result");
            FetchError::Api(format!("Yahoo chart for {}: {}", ticker, reason))
        })
    }

    /// Daily closes and volumes from the start of `range` up to (not including) its end.
    pub async fn daily_history(&self, ticker: &str, range: &DateRange) -> Result<Vec<ChartPoint>, FetchError> {
        let request = ApiRequest::get(format!("{}/{}", self.base_url, ticker))
            .param("period1", range.start_at().timestamp())
            .param("period2", range.end_at().timestamp())
            .param("interval", "1d");
        let result = self.chart(request, ticker).await?;

        let timestamps = result.get("timestamp").and_then(Value::as_array).cloned().unwrap_or_default();
        let closes = series(&result, "close");
        let volumes = series(&result, "volume");

        Ok(timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                let at = from_unix_secs(ts.as_i64()?)?;
                let price = (*closes.get(i)?)?;
                let volume = volumes.get(i).copied().flatten().unwrap_or(0.0);
                Some(ChartPoint {
                    date: at.format(DATE_FORMAT).to_string(),
                    price,
                    volume: volume.max(0.0) as u64,
                })
            })
            .collect())
    }

    pub async fn quote_stats(&self, ticker: &str) -> Result<QuoteStats, FetchError> {
        let request = ApiRequest::get(format!("{}/{}", self.base_url, ticker))
            .param("range", "7d")
            .param("interval", "1d");
        let result = self.chart(request, ticker).await?;
        let meta = result.get("meta").cloned().unwrap_or(Value::Null);

        let closes: Vec<f64> = series(&result, "close").into_iter().flatten().collect();
        let mut stats = QuoteStats {
            price: spot_from_meta(&meta),
            volume_24h: field_f64(&meta, "regularMarketVolume"),
            market_cap: field_f64(&meta, "marketCap"),
            ..QuoteStats::default()
        };
        if closes.len() >= 2 {
            stats.percent_change_24h = percent_change(closes[closes.len() - 2], closes[closes.len() - 1]);
        }
        if closes.len() >= 7 {
            stats.percent_change_7d = percent_change(closes[closes.len() - 7], closes[closes.len() - 1]);
        }
        Ok(stats)
    }

    /// Current price of e.g. `BTC-USD`.
    pub async fn spot_price(&self, ticker: &str) -> Result<f64, FetchError> {
        let request = ApiRequest::get(format!("{}/{}", self.base_url, ticker))
            .param("range", "1d")
            .param("interval", "1d");
        let result = self.chart(request, ticker).await?;
        Ok(spot_from_meta(result.get("meta").unwrap_or(&Value::Null)))
    }
}

fn spot_from_meta(meta: &Value) -> f64 {
    ["regularMarketPrice", "previousClose", "chartPreviousClose"]
        .iter()
        .find_map(|key| meta.get(*key).and_then(value_f64))
        .unwrap_or(0.0)
}

fn series(result: &Value, field: &str) -> Vec<Option<f64>> {
    result
        .pointer("/indicators/quote/0")
        .and_then(|quote| quote.get(field))
        .and_then(Value::as_array)
        .map(|values| values.iter().map(value_f64).collect())
        .unwrap_or_default()
}

fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}
