use std::sync::Arc;

use log::warn;

use super::expect_array;
use crate::http::{ApiRequest, FetchError, FetchJson};
use crate::market::{AggTrade, Candle, Ticker24h};

pub const BINANCE_API_URL: &str = "https://api.binance.com";

pub struct BinanceClient {
    base_url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl BinanceClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            base_url: BINANCE_API_URL.to_string(),
            fetcher,
        }
    }

    /// Candles for `symbol`, optionally bounded by open time in milliseconds.
    pub async fn klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let mut request = ApiRequest::get(format!("{}/api/v3/klines", self.base_url))
            .param("symbol", symbol)
            .param("interval", interval)
            .param("limit", limit);
        if let Some(start) = start_ms {
            request = request.param("startTime", start);
        }
        if let Some(end) = end_ms {
            request = request.param("endTime", end);
        }

        let data = self.fetcher.get_json(request).await?;
        let rows = expect_array(&data, "klines")?;
        let candles: Vec<Candle> = rows.iter().filter_map(Candle::from_kline).collect();
        if candles.len() != rows.len() {
            warn!("Skipped {} malformed {} klines", rows.len() - candles.len(), symbol);
        }
        Ok(candles)
    }

    pub async fn ticker_24h(&self, symbol: &str) -> Result<Ticker24h, FetchError> {
        let request = ApiRequest::get(format!("{}/api/v3/ticker/24hr", self.base_url)).param("symbol", symbol);
        let data = self.fetcher.get_json(request).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn agg_trades(&self, symbol: &str, limit: u32) -> Result<Vec<AggTrade>, FetchError> {
        let request = ApiRequest::get(format!("{}/api/v3/aggTrades", self.base_url))
            .param("symbol", symbol)
            .param("limit", limit);
        let data = self.fetcher.get_json(request).await?;
        Ok(serde_json::from_value(data)?)
    }
}
