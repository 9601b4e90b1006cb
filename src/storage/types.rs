use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BtcPriceRow {
    pub ticker: String,
    pub date: String,
    pub price_usd: f64,
}

/// Balance snapshot of one token held by a tracked Ethereum wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EthWalletRow {
    pub address: String,
    pub token: String,
    pub balance: f64,
    pub balance_usd: f64,
    pub timestamp: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BtcWalletRow {
    pub address: String,
    pub balance_btc: f64,
    pub balance_usd: f64,
    pub timestamp: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    /// Tracked wallet the transfer was fetched for.
    pub address: String,
    pub tx_hash: String,
    pub value: f64,
    pub value_usd: f64,
    pub date: String,
    pub timestamp: String,
    pub category: String,
    pub source_address: String,
    pub destination_address: String,
    #[serde(serialize_with = "as_flag")]
    pub confirmed: bool,
    pub token_symbol: String,
}

impl TransactionRow {
    pub fn is_outgoing(&self) -> bool {
        self.source_address.eq_ignore_ascii_case(&self.address)
    }

    pub fn is_incoming(&self) -> bool {
        self.destination_address.eq_ignore_ascii_case(&self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakingPoolRow {
    pub pool_name: String,
    pub total_eth_deposited: f64,
    pub eth_staked: f64,
    pub eth_unstaked: f64,
    pub staking_rewards: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakingQueueRow {
    pub queue_type: String,
    pub eth_amount: f64,
    /// Seconds.
    pub avg_wait_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakingRatioRow {
    pub date: String,
    pub staking_ratio: f64,
    pub avg_rewards: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArkhamBalanceRow {
    pub entity_id: String,
    pub token: String,
    pub balance: f64,
    pub balance_usd: f64,
    pub timestamp: String,
}

fn as_flag<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}
