use std::sync::Arc;

use zeroize::Zeroizing;

use super::field_f64;
use crate::http::{ApiRequest, FetchError, FetchJson};

pub const CMC_API_URL: &str = "https://pro-api.coinmarketcap.com";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CmcQuote {
    pub circulating_supply: f64,
    pub price: f64,
}

pub struct CoinMarketCapClient {
    base_url: String,
    api_key: Option<Zeroizing<String>>,
    fetcher: Arc<dyn FetchJson>,
}

impl CoinMarketCapClient {
    pub fn new(fetcher: Arc<dyn FetchJson>, api_key: Option<Zeroizing<String>>) -> Self {
        Self {
            base_url: CMC_API_URL.to_string(),
            api_key,
            fetcher,
        }
    }

    /// Latest USD quote. Both supply and price must be positive.
    pub async fn quote(&self, cmc_id: u32, symbol: &str) -> Result<CmcQuote, FetchError> {
        let api_key = self.api_key.as_ref().ok_or(FetchError::MissingApiKey("CMC_API_KEY"))?;
        let request = ApiRequest::get(format!("{}/v1/cryptocurrency/quotes/latest", self.base_url))
            .param("id", cmc_id)
            .param("convert", "USD")
            .header("X-CMC_PRO_API_KEY", api_key.as_str())
            .header("Accept", "application/json");

        let data = self.fetcher.get_json(request).await?;
        let entry = data
            .get("data")
            .and_then(|d| d.get(cmc_id.to_string()))
            .ok_or_else(|| FetchError::InvalidResponse(format!("Invalid CoinMarketCap response for {}: missing data", symbol)))?;

        let quote = CmcQuote {
            circulating_supply: field_f64(entry, "circulating_supply"),
            price: entry.pointer("/quote/USD").map_or(0.0, |usd| field_f64(usd, "price")),
        };
        if quote.circulating_supply <= 0.0 {
            return Err(FetchError::InvalidResponse(format!(
                "Invalid CoinMarketCap circulating supply for {}: {}",
                symbol, quote.circulating_supply
            )));
        }
        if quote.price <= 0.0 {
            return Err(FetchError::InvalidResponse(format!(
                "Invalid CoinMarketCap price for {}: {}",
                symbol, quote.price
            )));
        }
        Ok(quote)
    }
}
