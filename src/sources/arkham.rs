use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use zeroize::Zeroizing;

use super::field_f64;
use crate::http::{ApiRequest, FetchError, FetchJson};

pub const ARKHAM_API_URL: &str = "https://api.arkhamintelligence.com";

/// Holdings of one token summed over every chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenBalance {
    pub token: String,
    pub balance: f64,
    pub balance_usd: f64,
}

pub struct ArkhamClient {
    base_url: String,
    api_key: Option<Zeroizing<String>>,
    fetcher: Arc<dyn FetchJson>,
}

impl ArkhamClient {
    pub fn new(fetcher: Arc<dyn FetchJson>, api_key: Option<Zeroizing<String>>) -> Self {
        Self {
            base_url: ARKHAM_API_URL.to_string(),
            api_key,
            fetcher,
        }
    }

    /// Balances of `entity` grouped by token symbol, sorted by symbol.
    pub async fn entity_balances(&self, entity: &str) -> Result<Vec<TokenBalance>, FetchError> {
        let api_key = self.api_key.as_ref().ok_or(FetchError::MissingApiKey("ARKHAM_API_KEY"))?;
        let request = ApiRequest::get(format!("{}/balances/entity/{}", self.base_url, entity))
            .header("API-Key", api_key.as_str());

        let data = self.fetcher.get_json(request).await?;
        let chains = data
            .get("balances")
            .and_then(Value::as_object)
            .ok_or_else(|| FetchError::InvalidResponse(format!("no balances for entity {}", entity)))?;

        let mut totals: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for holdings in chains.values().filter_map(Value::as_array) {
            for holding in holdings {
                let Some(symbol) = holding.get("symbol").and_then(Value::as_str) else {
                    continue;
                };
                let entry = totals.entry(symbol.to_uppercase()).or_insert((0.0, 0.0));
                entry.0 += field_f64(holding, "balance");
                entry.1 += field_f64(holding, "usd");
            }
        }

        Ok(totals
            .into_iter()
            .map(|(token, (balance, balance_usd))| TokenBalance {
                token,
                balance,
                balance_usd,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockFetchJson;
    use serde_json::json;

    #[tokio::test]
    async fn test_balances_summed_across_chains() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json()
            .withf(|req| req.url.ends_with("/balances/entity/blackrock") && req.headers[0].0 == "API-Key")
            .returning(|_| {
                Ok(json!({"balances": {
                    "bitcoin": [{"symbol": "btc", "balance": 600000.0, "usd": 6.0e10}],
                    "ethereum": [
                        {"symbol": "eth", "balance": 1500000.0, "usd": 3.75e9},
                        {"symbol": "wbtc", "balance": 10.0, "usd": 1.0e6}
                    ],
                    "arbitrum_one": [{"symbol": "ETH", "balance": 0.5, "usd": 1250.0}, {"name": "junk"}]
                }}))
            });

        let client = ArkhamClient::new(Arc::new(mock), Some(Zeroizing::new("ark".into())));
        let balances = client.entity_balances("blackrock").await.unwrap();

        assert_eq!(balances.len(), 3);
        assert_eq!(balances[0].token, "BTC");
        assert_eq!(balances[1].token, "ETH");
        assert_eq!(balances[1].balance, 1_500_000.5);
        assert_eq!(balances[1].balance_usd, 3.75e9 + 1250.0);
    }

    #[tokio::test]
    async fn test_unexpected_shape() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json().returning(|_| Ok(json!({"message": "unauthorized"})));

        let client = ArkhamClient::new(Arc::new(mock), Some(Zeroizing::new("ark".into())));
        assert!(client.entity_balances("blackrock").await.is_err());
    }
}
