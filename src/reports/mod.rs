//! One report per data set the desktop shell asks for.
//!
//! Reports degrade instead of failing: an upstream call that errors is
//! logged and replaced by a neutral default. Only storage, configuration and
//! output-file failures abort a report.

mod arkham;
mod balances;
mod bitcoin;
mod blackrock;
mod coin;
mod eth;
mod lido;
mod polar;

pub use arkham::{arkham_report, ArkhamReport};
pub use balances::{balances_report, BalancePoint, BalanceSeries};
pub use bitcoin::bitcoin_report;
pub use blackrock::{blackrock_report, BlackrockReport};
pub use coin::CoinReport;
pub use eth::eth_report;
pub use lido::{lido_report, LidoReport};
pub use polar::{polar_report, PolarEntry};

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;

use crate::app_config::AppConfig;
use crate::error::Result;
use crate::http::{FetchError, FetchJson, HttpClient, ResponseCache, RetryConfig};
use crate::sources::{
    ArkhamClient, BeaconchainClient, BinanceClient, BlockchairClient, CoinGeckoClient, CoinMarketCapClient,
    EtherscanClient, LidoApiClient, MempoolClient, NewsApiClient, YahooClient,
};
use crate::storage::Database;

/// Everything a report needs: configuration, fetchers, and the clock.
pub struct ReportContext {
    pub config: AppConfig,
    pub fetcher: Arc<dyn FetchJson>,
    /// Fetcher for the Lido/Beaconchain/CMC session, which also retries 5xx.
    pub staking_fetcher: Arc<dyn FetchJson>,
    pub cache: Option<Arc<ResponseCache>>,
    pub now: DateTime<Utc>,
}

impl ReportContext {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let cache = Arc::new(ResponseCache::new(&config.cache_dir, config.cache_ttl)?);
        let client = HttpClient::new(config.http_timeout)?
            .with_cache(cache.clone())
            .with_signer(config.keys.binance_signer());
        let staking_client = client.clone().with_retry(RetryConfig::staking());

        Ok(Self {
            config,
            fetcher: Arc::new(client),
            staking_fetcher: Arc::new(staking_client),
            cache: Some(cache),
            now: Utc::now(),
        })
    }

    /// Context over a single fetcher and no cache.
    pub fn with_fetcher(config: AppConfig, fetcher: Arc<dyn FetchJson>, now: DateTime<Utc>) -> Self {
        Self {
            config,
            staking_fetcher: fetcher.clone(),
            fetcher,
            cache: None,
            now,
        }
    }

    /// Drop every cached response so a report sees fresh data. Returns the
    /// number of files removed.
    pub fn clear_cache(&self) -> usize {
        match &self.cache {
            Some(cache) => {
                let removed = cache.clear();
                info!("Cache cleared before fetching new data ({} files)", removed);
                removed
            }
            None => 0,
        }
    }

    pub fn open_db(&self) -> Result<Database> {
        Database::open(&self.config.db_path)
    }

    /// Pretty-print `value` to `<output_dir>/<file_name>`.
    pub fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.config.output_dir)?;
        let path = self.config.output_dir.join(file_name);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        info!("Data saved to {}", path.display());
        Ok(path)
    }

    pub fn timestamp(&self) -> String {
        self.now.format(crate::dates::DATETIME_FORMAT).to_string()
    }

    pub fn iso_timestamp(&self) -> String {
        crate::dates::isoformat(&self.now)
    }

    pub fn binance(&self) -> BinanceClient {
        BinanceClient::new(self.fetcher.clone())
    }

    pub fn coingecko(&self) -> CoinGeckoClient {
        CoinGeckoClient::new(self.fetcher.clone())
    }

    pub fn mempool(&self) -> MempoolClient {
        MempoolClient::new(self.fetcher.clone())
    }

    pub fn blockchair(&self) -> BlockchairClient {
        BlockchairClient::new(self.fetcher.clone())
    }

    pub fn etherscan(&self) -> EtherscanClient {
        EtherscanClient::new(self.fetcher.clone(), self.config.keys.etherscan.clone())
    }

    pub fn yahoo(&self) -> YahooClient {
        YahooClient::new(self.fetcher.clone())
    }

    pub fn newsapi(&self) -> NewsApiClient {
        NewsApiClient::new(self.fetcher.clone(), self.config.keys.newsapi.clone())
    }

    pub fn arkham(&self) -> ArkhamClient {
        ArkhamClient::new(self.fetcher.clone(), self.config.keys.arkham.clone())
    }

    pub fn coinmarketcap(&self) -> CoinMarketCapClient {
        CoinMarketCapClient::new(self.staking_fetcher.clone(), self.config.keys.coinmarketcap.clone())
    }

    pub fn staking_etherscan(&self) -> EtherscanClient {
        EtherscanClient::new(self.staking_fetcher.clone(), self.config.keys.etherscan.clone())
    }

    pub fn lido_api(&self) -> LidoApiClient {
        LidoApiClient::new(self.staking_fetcher.clone())
    }

    pub fn beaconchain(&self) -> BeaconchainClient {
        BeaconchainClient::new(self.staking_fetcher.clone())
    }
}

/// Keep the value of a soft upstream call, or log and fall back.
pub(crate) fn or_default<T>(result: std::result::Result<T, FetchError>, what: &str, default: T) -> T {
    match result {
        Ok(value) => value,
        Err(FetchError::MissingApiKey(key)) => {
            warn!("{} skipped: {} is not set", what, key);
            default
        }
        Err(e) => {
            error!("Failed to fetch {}: {}", what, e);
            default
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::ApiKeys;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_clear_cache_removes_responses_once() {
        let dir = tempdir().unwrap();
        let ctx = ReportContext::from_config(testing::config(dir.path(), ApiKeys::default())).unwrap();
        let cache = ctx.cache.clone().unwrap();
        cache.put("https://mempool.space/api/v1/fees/recommended", &json!({"fastestFee": 10}));
        cache.put("https://api.binance.com/api/v3/ticker/24hr", &json!({"lastPrice": "1"}));

        assert_eq!(ctx.clear_cache(), 2);
        assert_eq!(ctx.clear_cache(), 0);
        assert_eq!(cache.get("https://mempool.space/api/v1/fees/recommended"), None);
    }

    #[test]
    fn test_clear_cache_without_cache_is_noop() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |_| None);
        assert_eq!(ctx.clear_cache(), 0);
    }
}
