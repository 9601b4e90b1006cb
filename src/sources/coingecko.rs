use std::sync::Arc;

use serde_json::Value;

use super::{field_f64, field_string};
use crate::http::{ApiRequest, FetchError, FetchJson};

pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoinMarketData {
    pub market_cap: f64,
    pub circulating_supply: f64,
    pub max_supply: f64,
    pub percent_change_7d: f64,
    pub percent_change_30d: f64,
    /// 0 when CoinGecko does not report it.
    pub market_dominance: f64,
    pub last_updated: String,
}

pub struct CoinGeckoClient {
    base_url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl CoinGeckoClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            base_url: COINGECKO_API_URL.to_string(),
            fetcher,
        }
    }

    pub async fn coin_market_data(&self, coin_id: &str) -> Result<CoinMarketData, FetchError> {
        let request = ApiRequest::get(format!("{}/coins/{}", self.base_url, coin_id))
            .param("localization", "false")
            .param("tickers", "false")
            .param("market_data", "true")
            .param("community_data", "false")
            .param("developer_data", "false")
            .param("sparkline", "false");

        let data = self.fetcher.get_json(request).await?;
        let market = data
            .get("market_data")
            .ok_or_else(|| FetchError::InvalidResponse(format!("no market_data for {}", coin_id)))?;

        Ok(CoinMarketData {
            market_cap: market.get("market_cap").map_or(0.0, |caps| field_f64(caps, "usd")),
            circulating_supply: field_f64(market, "circulating_supply"),
            max_supply: field_f64(market, "max_supply"),
            percent_change_7d: field_f64(market, "price_change_percentage_7d"),
            percent_change_30d: field_f64(market, "price_change_percentage_30d"),
            market_dominance: field_f64(market, "market_cap_dominance"),
            last_updated: field_string(market, "last_updated"),
        })
    }

    /// Total crypto market capitalisation in USD.
    pub async fn global_market_cap_usd(&self) -> Result<f64, FetchError> {
        let data = self
            .fetcher
            .get_json(ApiRequest::get(format!("{}/global", self.base_url)))
            .await?;
        data.get("data")
            .and_then(|d| d.get("total_market_cap"))
            .map(|caps| field_f64(caps, "usd"))
            .ok_or_else(|| FetchError::InvalidResponse(format!("global response without data: {}", preview(&data))))
    }
}

fn preview(value: &Value) -> String {
    let text = value.to_string();
    text.chars().take(200).collect()
}
