use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::error::{Result, WhaleScopeError};
use crate::http::BinanceSigner;

/// Upstream credentials. All optional; sources needing a missing key degrade to defaults.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub binance_api_key: Option<Zeroizing<String>>,
    pub binance_api_secret: Option<Zeroizing<String>>,
    pub etherscan: Option<Zeroizing<String>>,
    pub coinmarketcap: Option<Zeroizing<String>>,
    pub newsapi: Option<Zeroizing<String>>,
    pub arkham: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("binance", &self.binance_api_key.is_some())
            .field("etherscan", &self.etherscan.is_some())
            .field("coinmarketcap", &self.coinmarketcap.is_some())
            .field("newsapi", &self.newsapi.is_some())
            .field("arkham", &self.arkham.is_some())
            .finish()
    }
}

impl ApiKeys {
    pub fn load_from_env() -> Self {
        Self {
            binance_api_key: secret("BINANCE_API_KEY"),
            binance_api_secret: secret("BINANCE_API_SECRET"),
            etherscan: secret("ETHERSCAN_API_KEY"),
            coinmarketcap: secret("CMC_API_KEY"),
            newsapi: secret("NEWSAPI_KEY"),
            arkham: secret("ARKHAM_API_KEY"),
        }
    }

    pub fn binance_signer(&self) -> Option<BinanceSigner> {
        match (&self.binance_api_key, &self.binance_api_secret) {
            (Some(key), Some(secret)) => Some(BinanceSigner::new(key.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub keys: ApiKeys,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub db_path: PathBuf,
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn load_from_env() -> Result<Self> {
        Ok(Self {
            keys: ApiKeys::load_from_env(),
            cache_dir: path_var("WHALESCOPE_CACHE_DIR").unwrap_or_else(|| PathBuf::from("cache")),
            cache_ttl: Duration::from_secs(parse_var("WHALESCOPE_CACHE_TTL_SECS", 300)?),
            db_path: path_var("WHALESCOPE_DB").unwrap_or_else(|| PathBuf::from("whalescope.db")),
            output_dir: path_var("WHALESCOPE_OUTPUT_DIR").unwrap_or_else(|| PathBuf::from(".")),
            log_dir: path_var("WHALESCOPE_LOG_DIR").unwrap_or_else(default_log_dir),
            http_timeout: Duration::from_secs(parse_var("WHALESCOPE_HTTP_TIMEOUT_SECS", 10)?),
        })
    }
}

/// Platform log directory, e.g. `~/.cache/WhaleScope/log` on Linux.
pub fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|d| d.join("Library").join("Logs").join("WhaleScope"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    } else {
        dirs::cache_dir()
            .map(|d| d.join("WhaleScope").join("log"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }
}

fn secret(name: &str) -> Option<Zeroizing<String>> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(Zeroizing::new)
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var(name).ok().filter(|value| !value.trim().is_empty()).map(PathBuf::from)
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WhaleScopeError::Config(format!("{} must be a number, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_reports_bad_numbers() {
        env::set_var("WHALESCOPE_TEST_BAD_TTL", "five minutes");
        let err = parse_var::<u64>("WHALESCOPE_TEST_BAD_TTL", 300).unwrap_err();
        assert!(err.to_string().contains("WHALESCOPE_TEST_BAD_TTL"));
        env::remove_var("WHALESCOPE_TEST_BAD_TTL");
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        assert_eq!(parse_var::<u64>("WHALESCOPE_TEST_UNSET_VAR", 10).unwrap(), 10);
    }

    #[test]
    fn test_blank_secret_is_none() {
        env::set_var("WHALESCOPE_TEST_BLANK_KEY", "   ");
        assert!(secret("WHALESCOPE_TEST_BLANK_KEY").is_none());
        env::remove_var("WHALESCOPE_TEST_BLANK_KEY");
    }

    #[test]
    fn test_signer_requires_both_halves() {
        let keys = ApiKeys {
            binance_api_key: Some(Zeroizing::new("key".into())),
            ..ApiKeys::default()
        };
        assert!(keys.binance_signer().is_none());
        assert!(!format!("{:?}", keys).contains("\"key\""));
    }
}
