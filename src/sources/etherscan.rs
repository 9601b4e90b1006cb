use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use zeroize::Zeroizing;

use super::{field_string, scale_units};
use crate::http::{ApiRequest, FetchError, FetchJson};

pub const ETHERSCAN_API_URL: &str = "https://api.etherscan.io/api";
pub const ETH_DECIMALS: u32 = 18;

/// Row of `txlist` / `tokentx`. Amounts stay as base-unit strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EtherscanTx {
    pub hash: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "timeStamp", default)]
    pub time_stamp: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: String,
}

impl EtherscanTx {
    pub fn timestamp(&self) -> Option<i64> {
        self.time_stamp.parse().ok()
    }

    pub fn amount(&self, decimals: u32) -> Result<f64, FetchError> {
        scale_units(&self.value, decimals)
    }

    pub fn is_mined(&self) -> bool {
        !self.block_number.is_empty()
    }
}

pub struct EtherscanClient {
    base_url: String,
    api_key: Option<Zeroizing<String>>,
    fetcher: Arc<dyn FetchJson>,
}

impl EtherscanClient {
    pub fn new(fetcher: Arc<dyn FetchJson>, api_key: Option<Zeroizing<String>>) -> Self {
        Self {
            base_url: ETHERSCAN_API_URL.to_string(),
            api_key,
            fetcher,
        }
    }

    async fn call(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let api_key = self.api_key.as_ref().ok_or(FetchError::MissingApiKey("ETHERSCAN_API_KEY"))?;
        let data = self.fetcher.get_json(request.secret_param("apikey", api_key)).await?;

        let ok = data.get("status").and_then(Value::as_str) == Some("1");
        let result = data.get("result").cloned().unwrap_or(Value::Null);
        // "No transactions found" comes back as status 0 with an empty list
        if !ok && !result.is_array() {
            return Err(FetchError::Api(format!(
                "Etherscan error: {} ({})",
                field_string(&data, "message"),
                field_string(&data, "result")
            )));
        }
        Ok(result)
    }

    fn account(&self, action: &str) -> ApiRequest {
        ApiRequest::get(&self.base_url).param("module", "account").param("action", action)
    }

    fn scaled(result: &Value, decimals: u32) -> Result<f64, FetchError> {
        let raw = result
            .as_str()
            .ok_or_else(|| FetchError::InvalidResponse(format!("expected an amount string, got {}", result)))?;
        scale_units(raw, decimals)
    }

    pub async fn eth_balance(&self, address: &str) -> Result<f64, FetchError> {
        let request = self.account("balance").param("address", address).param("tag", "latest");
        Self::scaled(&self.call(request).await?, ETH_DECIMALS)
    }

    pub async fn token_balance(&self, contract: &str, address: &str, decimals: u32) -> Result<f64, FetchError> {
        let request = self
            .account("tokenbalance")
            .param("contractaddress", contract)
            .param("address", address)
            .param("tag", "latest");
        Self::scaled(&self.call(request).await?, decimals)
    }

    /// Normal transactions, newest first.
    pub async fn tx_list(&self, address: &str) -> Result<Vec<EtherscanTx>, FetchError> {
        let request = self
            .account("txlist")
            .param("address", address)
            .param("startblock", 0)
            .param("endblock", 99_999_999)
            .param("sort", "desc");
        Ok(serde_json::from_value(self.call(request).await?)?)
    }

    /// ERC-20 transfers of `contract`, newest first.
    pub async fn token_tx_list(&self, contract: &str, address: &str) -> Result<Vec<EtherscanTx>, FetchError> {
        let request = self
            .account("tokentx")
            .param("contractaddress", contract)
            .param("address", address)
            .param("startblock", 0)
            .param("endblock", 99_999_999)
            .param("sort", "desc");
        Ok(serde_json::from_value(self.call(request).await?)?)
    }

    /// Total ETH supply.
    pub async fn eth_supply(&self) -> Result<f64, FetchError> {
        let request = ApiRequest::get(&self.base_url).param("module", "stats").param("action", "ethsupply");
        Self::scaled(&self.call(request).await?, ETH_DECIMALS)
    }
}
