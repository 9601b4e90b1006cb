//! Thin clients for the upstream market-data and explorer APIs.
//!
//! Every client goes through [`FetchJson`](crate::http::FetchJson), so retry,
//! caching and signing live in one place and tests can swap in a mock.

mod arkham;
mod binance;
mod blockchair;
mod coingecko;
mod coinmarketcap;
mod etherscan;
mod mempool;
mod newsapi;
mod staking;
mod yahoo;

pub use arkham::{ArkhamClient, TokenBalance};
pub use binance::BinanceClient;
pub use blockchair::{BlockchairClient, LARGE_TX_USD};
pub use coingecko::{CoinGeckoClient, CoinMarketData};
pub use coinmarketcap::{CmcQuote, CoinMarketCapClient};
pub use etherscan::{EtherscanClient, EtherscanTx};
pub use mempool::{MempoolClient, MempoolTx, RecommendedFees};
pub use newsapi::{NewsApiClient, NewsArticle};
pub use staking::{BeaconchainClient, LidoApiClient, ValidatorQueue};
pub use yahoo::{ChartPoint, QuoteStats, YahooClient};

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::http::FetchError;
use crate::market::value_f64;

/// Scale an integer base-unit string (wei, token units) down by `decimals`.
pub fn scale_units(raw: &str, decimals: u32) -> Result<f64, FetchError> {
    let units: i128 = raw
        .trim()
        .parse()
        .map_err(|_| FetchError::InvalidResponse(format!("not an integer amount: '{}'", raw)))?;
    let scaled = Decimal::try_from_i128_with_scale(units, decimals)
        .map_err(|e| FetchError::InvalidResponse(format!("amount {} out of range: {}", raw, e)))?;
    scaled
        .to_f64()
        .ok_or_else(|| FetchError::InvalidResponse(format!("amount {} not representable", raw)))
}

pub(crate) fn expect_array<'a>(value: &'a Value, what: &str) -> Result<&'a Vec<Value>, FetchError> {
    value
        .as_array()
        .ok_or_else(|| FetchError::InvalidResponse(format!("{}: expected a list, got {}", what, value)))
}

/// Numeric field, 0 when missing, null or malformed.
pub(crate) fn field_f64(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(value_f64).unwrap_or(0.0)
}

/// Render a loosely-typed field as text; missing values become `N/A`.
pub(crate) fn field_string(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scale_units_is_exact() {
        assert_eq!(scale_units("1500000000000000000", 18).unwrap(), 1.5);
        assert_eq!(scale_units("2500000", 6).unwrap(), 2.5);
        assert_eq!(scale_units("0", 18).unwrap(), 0.0);
        assert!(scale_units("0x1f", 18).is_err());
    }

    #[test]
    fn test_field_helpers() {
        let value = json!({"a": "1.5", "b": null, "c": 7, "t": 1700000000});
        assert_eq!(field_f64(&value, "a"), 1.5);
        assert_eq!(field_f64(&value, "b"), 0.0);
        assert_eq!(field_f64(&value, "missing"), 0.0);
        assert_eq!(field_string(&value, "t"), "1700000000");
        assert_eq!(field_string(&value, "b"), "N/A");
    }
}
