use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{error, info};
use reqwest::Url;
use serde_json::Value;

use super::{
    cache::ResponseCache,
    error::FetchError,
    retry::{RetryConfig, RetryHandler},
    signer::BinanceSigner,
    types::ApiRequest,
};

/// Anything that can answer an [`ApiRequest`] with JSON.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FetchJson: Send + Sync {
    async fn get_json(&self, request: ApiRequest) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: reqwest::Client,
    timeout: Duration,
    cache: Option<Arc<ResponseCache>>,
    retry_handler: RetryHandler,
    signer: Option<BinanceSigner>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("whalescope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        Ok(Self {
            http_client,
            timeout,
            cache: None,
            retry_handler: RetryHandler::new(RetryConfig::default()),
            signer: None,
        })
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry_handler = RetryHandler::new(config);
        self
    }

    pub fn with_signer(mut self, signer: Option<BinanceSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Final URL for `request`, with `timestamp` and `signature` appended when signed.
    pub fn build_url(&self, request: &ApiRequest, timestamp_ms: i64) -> Result<Url, FetchError> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| FetchError::InvalidResponse(format!("bad url {}: {}", request.url, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in request.params.iter().chain(&request.secret_params) {
                pairs.append_pair(key, value);
            }
            if request.signed {
                pairs.append_pair("timestamp", &timestamp_ms.to_string());
            }
        }

        if request.signed {
            let signer = self
                .signer
                .as_ref()
                .ok_or(FetchError::MissingApiKey("BINANCE_API_SECRET"))?;
            let signature = signer.sign(url.query().unwrap_or_default())?;
            url.query_pairs_mut().append_pair("signature", &signature);
        }

        // an empty `?` confuses some upstreams
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        let url = self.build_url(request, Utc::now().timestamp_millis())?;

        let mut builder = self.http_client.get(url);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if request.signed {
            if let Some(signer) = &self.signer {
                builder = builder.header("X-MBX-APIKEY", signer.api_key());
            }
        }

        let response = builder.send().await.map_err(|e| FetchError::from_reqwest(e, self.timeout))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = FetchError::from_status(&request.url, status.as_u16(), body);
            error!("{}", err);
            return Err(err);
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);

        let body = response.text().await.map_err(|e| FetchError::from_reqwest(e, self.timeout))?;
        decode_body(&body, is_json)
    }
}

/// JSON bodies are parsed, anything else is kept as a JSON string.
pub fn decode_body(body: &str, is_json: bool) -> Result<Value, FetchError> {
    if is_json {
        Ok(serde_json::from_str(body)?)
    } else {
        Ok(Value::String(body.to_string()))
    }
}

#[async_trait]
impl FetchJson for HttpClient {
    async fn get_json(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let cache_key = request.cache_key();
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&cache_key) {
                return Ok(cached);
            }
        }

        info!("Requesting {} with params {:?}", request.url, request.params);
        let data = self
            .retry_handler
            .retry(|| self.send_once(&request))
            .await
            .map_err(|e| {
                error!("Request to {} failed: {}", request.url, e);
                e
            })?;

        if let Some(cache) = &self.cache {
            cache.put(&cache_key, &data);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use zeroize::Zeroizing;

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(10)).unwrap()
    }

    #[test]
    fn test_build_url_appends_params() {
        let request = ApiRequest::get("https://api.binance.com/api/v3/ticker/24hr").param("symbol", "BTCUSDT");
        let url = client().build_url(&request, 0).unwrap();
        assert_eq!(url.as_str(), "https://api.binance.com/api/v3/ticker/24hr?symbol=BTCUSDT");
    }

    #[test]
    fn test_build_url_without_params_has_no_query() {
        let request = ApiRequest::get("https://mempool.space/api/v1/fees/recommended");
        let url = client().build_url(&request, 0).unwrap();
        assert_eq!(url.as_str(), "https://mempool.space/api/v1/fees/recommended");
    }

    #[test]
    fn test_signed_url_carries_timestamp_and_signature() {
        let signer = BinanceSigner::new(Zeroizing::new("key".into()), Zeroizing::new("secret".into()));
        let client = client().with_signer(Some(signer.clone()));
        let request = ApiRequest::get("https://api.binance.com/api/v3/account").param("recvWindow", 5000).signed();

        let url = client.build_url(&request, 1_499_827_319_559).unwrap();
        let query = url.query().unwrap();
        let (payload, signature) = query.split_once("&signature=").unwrap();

        assert_eq!(payload, "recvWindow=5000&timestamp=1499827319559");
        assert_eq!(signature, signer.sign(payload).unwrap());
    }

    #[test]
    fn test_signed_request_without_signer_fails() {
        let request = ApiRequest::get("https://api.binance.com/api/v3/account").signed();
        let err = client().build_url(&request, 0).unwrap_err();
        assert!(matches!(err, FetchError::MissingApiKey(_)));
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(r#"{"a":1}"#, true).unwrap(), json!({"a": 1}));
        assert_eq!(decode_body("hello", false).unwrap(), json!("hello"));
        assert!(decode_body("<html>", true).is_err());
    }

    #[tokio::test]
    async fn test_cached_response_skips_network() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(ResponseCache::new(dir.path(), Duration::from_secs(300)).unwrap());
        // unroutable host: only the cache can answer
        let request = ApiRequest::get("http://127.0.0.1:9/never").param("q", 1);
        cache.put(&request.cache_key(), &json!({"cached": true}));

        let client = client().with_cache(cache).with_retry(RetryConfig::immediate(1));
        let value = client.get_json(request).await.unwrap();
        assert_eq!(value, json!({"cached": true}));
    }

    #[tokio::test]
    async fn test_timeout_reports_configured_limit() {
        // accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let client = HttpClient::new(Duration::from_millis(200))
            .unwrap()
            .with_retry(RetryConfig::immediate(1));
        let err = client
            .get_json(ApiRequest::get(format!("http://{}/slow", addr)))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout(limit) if limit == Duration::from_millis(200)));
        assert_eq!(err.to_string(), "Timeout error after 200ms");
    }
}
