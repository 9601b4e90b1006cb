use std::sync::Arc;

use serde_json::Value;

use crate::http::{ApiRequest, FetchError, FetchJson};
use crate::market::value_f64;

pub const LIDO_APR_URL: &str = "https://eth-api.lido.fi/v1/protocol/steth/apr/last";
pub const BEACONCHAIN_QUEUE_URL: &str = "https://beaconcha.in/api/v1/validators/queue";

pub struct LidoApiClient {
    url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl LidoApiClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            url: LIDO_APR_URL.to_string(),
            fetcher,
        }
    }

    /// Latest stETH APR in percent.
    pub async fn steth_apr(&self) -> Result<f64, FetchError> {
        let data = self.fetcher.get_json(ApiRequest::get(&self.url)).await?;
        data.pointer("/data/apr")
            .and_then(value_f64)
            .ok_or_else(|| FetchError::InvalidResponse(format!("Lido APR response without data.apr: {}", data)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorQueue {
    pub entering: u64,
    pub exiting: u64,
}

pub struct BeaconchainClient {
    url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl BeaconchainClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            url: BEACONCHAIN_QUEUE_URL.to_string(),
            fetcher,
        }
    }

    pub async fn validator_queue(&self) -> Result<ValidatorQueue, FetchError> {
        let data = self.fetcher.get_json(ApiRequest::get(&self.url)).await?;
        let count = |key: &str| {
            data.pointer(&format!("/data/{}", key))
                .and_then(Value::as_u64)
                .ok_or_else(|| FetchError::InvalidResponse(format!("validator queue without {}", key)))
        };
        Ok(ValidatorQueue {
            entering: count("beaconchain_entering")?,
            exiting: count("beaconchain_exiting")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockFetchJson;
    use serde_json::json;

    #[tokio::test]
    async fn test_steth_apr() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json()
            .withf(|req| req.url == LIDO_APR_URL)
            .returning(|_| Ok(json!({"data": {"timeUnix": 1746100000, "apr": 2.874}, "meta": {"symbol": "stETH"}})));

        let apr = LidoApiClient::new(Arc::new(mock)).steth_apr().await.unwrap();
        assert_eq!(apr, 2.874);
    }

    #[tokio::test]
    async fn test_validator_queue() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json().returning(|_| {
            Ok(json!({"status": "OK", "data": {"beaconchain_entering": 1200, "beaconchain_exiting": 35, "validatorscount": 1_050_000}}))
        });

        let queue = BeaconchainClient::new(Arc::new(mock)).validator_queue().await.unwrap();
        assert_eq!(queue, ValidatorQueue { entering: 1200, exiting: 35 });
    }

    #[tokio::test]
    async fn test_validator_queue_missing_field() {
        let mut mock = MockFetchJson::new();
        mock.expect_get_json().returning(|_| Ok(json!({"status": "OK", "data": {"beaconchain_entering": 1}})));

        assert!(BeaconchainClient::new(Arc::new(mock)).validator_queue().await.is_err());
    }
}
