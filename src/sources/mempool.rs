use std::sync::Arc;

use serde::Deserialize;

use super::field_f64;
use crate::http::{ApiRequest, FetchError, FetchJson};

pub const MEMPOOL_API_URL: &str = "https://mempool.space/api";
pub const SATS_PER_BTC: f64 = 100_000_000.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecommendedFees {
    pub fastest_fee: f64,
    pub half_hour_fee: f64,
    pub hour_fee: f64,
}

impl RecommendedFees {
    /// Mean of the fastest, half-hour and hour targets, in sat/vB.
    pub fn average(&self) -> f64 {
        (self.fastest_fee + self.half_hour_fee + self.hour_fee) / 3.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxStatus {
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub block_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Prevout {
    #[serde(default)]
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxInput {
    #[serde(default)]
    pub prevout: Option<Prevout>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TxOutput {
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub scriptpubkey_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MempoolTx {
    pub txid: String,
    #[serde(default)]
    pub status: TxStatus,
    #[serde(default)]
    pub vin: Vec<TxInput>,
    #[serde(default)]
    pub vout: Vec<TxOutput>,
    #[serde(default)]
    pub fee: u64,
}

impl MempoolTx {
    pub fn input_btc(&self) -> f64 {
        let sats: u64 = self.vin.iter().filter_map(|vin| vin.prevout.as_ref()).map(|p| p.value).sum();
        sats as f64 / SATS_PER_BTC
    }

    pub fn output_btc(&self) -> f64 {
        let sats: u64 = self.vout.iter().map(|vout| vout.value).sum();
        sats as f64 / SATS_PER_BTC
    }

    pub fn fee_btc(&self) -> f64 {
        self.fee as f64 / SATS_PER_BTC
    }

    pub fn first_recipient(&self) -> Option<&str> {
        self.vout.first().and_then(|vout| vout.scriptpubkey_address.as_deref())
    }
}

pub struct MempoolClient {
    base_url: String,
    fetcher: Arc<dyn FetchJson>,
}

impl MempoolClient {
    pub fn new(fetcher: Arc<dyn FetchJson>) -> Self {
        Self {
            base_url: MEMPOOL_API_URL.to_string(),
            fetcher,
        }
    }

    pub async fn recommended_fees(&self) -> Result<RecommendedFees, FetchError> {
        let data = self
            .fetcher
            .get_json(ApiRequest::get(format!("{}/v1/fees/recommended", self.base_url)))
            .await?;
        Ok(RecommendedFees {
            fastest_fee: field_f64(&data, "fastestFee"),
            half_hour_fee: field_f64(&data, "halfHourFee"),
            hour_fee: field_f64(&data, "hourFee"),
        })
    }

    /// Confirmed balance (funded minus spent outputs) in BTC.
    pub async fn address_balance(&self, address: &str) -> Result<f64, FetchError> {
        let data = self
            .fetcher
            .get_json(ApiRequest::get(format!("{}/address/{}", self.base_url, address)))
            .await?;
        let stats = data
            .get("chain_stats")
            .ok_or_else(|| FetchError::InvalidResponse(format!("no chain_stats for {}", address)))?;
        let sats = field_f64(stats, "funded_txo_sum") - field_f64(stats, "spent_txo_sum");
        Ok(sats / SATS_PER_BTC)
    }

    pub async fn address_txs(&self, address: &str) -> Result<Vec<MempoolTx>, FetchError> {
        let data = self
            .fetcher
            .get_json(ApiRequest::get(format!("{}/address/{}/txs", self.base_url, address)))
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn recent_transactions(&self) -> Result<Vec<MempoolTx>, FetchError> {
        let data = self
            .fetcher
            .get_json(ApiRequest::get(format!("{}/v1/transactions", self.base_url)))
            .await?;
        Ok(serde_json::from_value(data)?)
    }
}
