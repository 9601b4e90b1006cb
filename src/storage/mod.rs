mod db;
mod types;

pub use db::Database;
pub use types::{
    ArkhamBalanceRow, BtcPriceRow, BtcWalletRow, EthWalletRow, StakingPoolRow, StakingQueueRow, StakingRatioRow,
    TransactionRow,
};
