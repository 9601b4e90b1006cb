use std::collections::BTreeMap;

/// A GET request against an upstream API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    pub url: String,
    pub params: BTreeMap<String, String>,
    /// Query params kept out of logs and cache keys (API keys).
    pub secret_params: BTreeMap<String, String>,
    pub headers: Vec<(String, String)>,
    /// Binance-style HMAC signing of the query string
    pub signed: bool,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn secret_param(mut self, key: &str, value: &str) -> Self {
        self.secret_params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    /// URL followed by the sorted params as JSON; signatures never take part.
    pub fn cache_key(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let params = serde_json::to_string(&self.params).unwrap_or_default();
        format!("{}{}", self.url, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = ApiRequest::get("https://api.binance.com/api/v3/klines")
            .param("symbol", "BTCUSDT")
            .param("interval", "1d");
        let b = ApiRequest::get("https://api.binance.com/api/v3/klines")
            .param("interval", "1d")
            .param("symbol", "BTCUSDT");

        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(
            a.cache_key(),
            r#"https://api.binance.com/api/v3/klines{"interval":"1d","symbol":"BTCUSDT"}"#
        );
    }

    #[test]
    fn test_secret_params_stay_out_of_cache_key() {
        let request = ApiRequest::get("https://api.etherscan.io/api")
            .param("module", "stats")
            .secret_param("apikey", "hunter2");
        assert!(!request.cache_key().contains("hunter2"));
    }

    #[test]
    fn test_cache_key_without_params_is_url() {
        let request = ApiRequest::get("https://mempool.space/api/v1/fees/recommended");
        assert_eq!(request.cache_key(), "https://mempool.space/api/v1/fees/recommended");
    }
}
