use std::sync::Arc;

use serde_json::Value;

use super::{expect_array, field_f64, field_string};
use crate::http::{ApiRequest, FetchError, FetchJson};
use crate::market::TopFlow;

pub const THREEXPL_API_URL: &str = "https://api.3xpl.com";
pub const BLOCKCHAIR_API_URL: &str = "https://api.blockchair.com";

/// Transactions moving at least this much USD are "large".
pub const LARGE_TX_USD: u64 = 1_000_000;
const LARGE_TX_LIMIT: u32 = 5;

/// Large Bitcoin transactions from 3xpl (v3) and Blockchair (v2).
pub struct BlockchairClient {
    v3_url: String,
    v2_url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl BlockchairClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            v3_url: THREEXPL_API_URL.to_string(),
            v2_url: BLOCKCHAIR_API_URL.to_string(),
            fetcher,
        }
    }

    pub async fn large_transactions_v3(&self) -> Result<Vec<TopFlow>, FetchError> {
        let request = ApiRequest::get(format!("{}/bitcoin/transactions", self.v3_url))
            .param("order", "input_total_usd:desc")
            .param("input_total_usd[gte]", LARGE_TX_USD)
            .param("limit", LARGE_TX_LIMIT);
        let data = self.fetcher.get_json(request).await?;

        Ok(rows(&data)?
            .iter()
            .map(|tx| TopFlow {
                hash: field_string(tx, "txid"),
                time: field_string(tx, "time"),
                input_total_usd: field_f64(tx, "input_total_usd"),
                output_total_usd: field_f64(tx, "output_total_usd"),
                fee_usd: field_f64(tx, "fee_usd"),
                is_confirmed: tx.get("confirmed").and_then(Value::as_bool).unwrap_or(true),
            })
            .collect())
    }

    pub async fn large_transactions_v2(&self) -> Result<Vec<TopFlow>, FetchError> {
        let request = ApiRequest::get(format!("{}/bitcoin/transactions", self.v2_url))
            .param("sort", "input_total_usd(desc)")
            .param("q", format!("input_total_usd>={}", LARGE_TX_USD))
            .param("limit", LARGE_TX_LIMIT);
        let data = self.fetcher.get_json(request).await?;

        Ok(rows(&data)?
            .iter()
            .map(|tx| TopFlow {
                hash: field_string(tx, "hash"),
                time: field_string(tx, "time"),
                input_total_usd: field_f64(tx, "input_total_usd"),
                output_total_usd: field_f64(tx, "output_total_usd"),
                fee_usd: field_f64(tx, "fee_usd"),
                // unconfirmed transactions carry block_id -1
                is_confirmed: tx.get("block_id").and_then(Value::as_i64).unwrap_or(-1) != -1,
            })
            .collect())
    }
}

fn rows(data: &Value) -> Result<&Vec<Value>, FetchError> {
    let rows = data
        .get("data")
        .ok_or_else(|| FetchError::InvalidResponse("large transactions without data".to_string()))?;
    expect_array(rows, "large transactions")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockFetchJson;
    use serde_json::json;

    #[tokio::test]
    async fn test_v3_rows() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json()
            .withf(|req| req.url == "https://api.3xpl.com/bitcoin/transactions" && req.params["input_total_usd[gte]"] == "1000000")
            .returning(|_| {
                Ok(json!({"data": [{
                    "txid": "aa", "time": "2025-06-01 10:00:00",
                    "input_total_usd": "2500000.5", "output_total_usd": 2499000.0, "fee_usd": 12.5
                }]}))
            });

        let flows = BlockchairClient::new(Arc::new(mock)).large_transactions_v3().await.unwrap();
        assert_eq!(flows.len(), 1);
        assert_eq!(flows[0].hash, "aa");
        assert_eq!(flows[0].input_total_usd, 2_500_000.5);
        assert!(flows[0].is_confirmed);
    }

    #[tokio::test]
    async fn test_v2_confirmation_from_block_id() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json().returning(|_| {
            Ok(json!({"data": [
                {"hash": "bb", "time": "2025-06-01 10:00:00", "block_id": 899000, "input_total_usd": 1.0e6},
                {"hash": "cc", "time": "2025-06-01 10:05:00", "block_id": -1, "input_total_usd": 2.0e6}
            ]}))
        });

        let flows = BlockchairClient::new(Arc::new(mock)).large_transactions_v2().await.unwrap();
        assert!(flows[0].is_confirmed);
        assert!(!flows[1].is_confirmed);
        assert_eq!(flows[1].fee_usd, 0.0);
    }

    #[tokio::test]
    async fn test_missing_data_is_an_error() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json().returning(|_| Ok(json!({"context": {"error": "limit"}})));

        assert!(BlockchairClient::new(Arc::new(mock)).large_transactions_v2().await.is_err());
    }
}
