use std::path::Path;

use log::info;
use rusqlite::{params, params_from_iter, Connection};

use super::types::{
    ArkhamBalanceRow, BtcPriceRow, BtcWalletRow, EthWalletRow, StakingPoolRow, StakingQueueRow, StakingRatioRow,
    TransactionRow,
};
use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS btc_prices (
    ticker TEXT, date TEXT, price_usd REAL
);
CREATE TABLE IF NOT EXISTS eth_wallets (
    address TEXT, token TEXT, balance REAL, balance_usd REAL, timestamp TEXT, category TEXT
);
CREATE TABLE IF NOT EXISTS btc_wallets (
    address TEXT, balance_btc REAL, balance_usd REAL, timestamp TEXT, category TEXT
);
CREATE TABLE IF NOT EXISTS transactions (
    address TEXT, tx_hash TEXT, value REAL, value_usd REAL, date TEXT, timestamp TEXT,
    category TEXT, source_address TEXT, destination_address TEXT, confirmed INTEGER, token_symbol TEXT
);
CREATE TABLE IF NOT EXISTS liquid_staking_pools (
    pool_name TEXT, total_eth_deposited REAL, eth_staked REAL, eth_unstaked REAL,
    staking_rewards REAL, timestamp TEXT
);
CREATE TABLE IF NOT EXISTS eth_staking_queues (
    queue_type TEXT, eth_amount REAL, avg_wait_time REAL, timestamp TEXT
);
CREATE TABLE IF NOT EXISTS eth_staking_ratio (
    date TEXT, staking_ratio REAL, avg_rewards REAL, timestamp TEXT
);
CREATE TABLE IF NOT EXISTS arkham_wallets (
    entity_id TEXT, token TEXT, balance REAL, balance_usd REAL, timestamp TEXT
);
";

/// The local `whalescope.db` store.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        info!("Connecting to database {}", path.display());
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        info!("Database tables migrated successfully");
        Ok(Self { conn })
    }

    /// Swap the whole price history for `rows`.
    pub fn replace_btc_prices(&mut self, rows: &[BtcPriceRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM btc_prices", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO btc_prices (ticker, date, price_usd) VALUES (?1, ?2, ?3)")?;
            for row in rows {
                stmt.execute(params![row.ticker, row.date, row.price_usd])?;
            }
        }
        tx.commit()?;
        info!("Historical data inserted: {} rows", rows.len());
        Ok(())
    }

    pub fn btc_prices(&self) -> Result<Vec<BtcPriceRow>> {
        let mut stmt = self.conn.prepare("SELECT ticker, date, price_usd FROM btc_prices ORDER BY date")?;
        let rows = stmt.query_map([], |row| {
            Ok(BtcPriceRow {
                ticker: row.get(0)?,
                date: row.get(1)?,
                price_usd: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn insert_eth_wallets(&mut self, rows: &[EthWalletRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO eth_wallets (address, token, balance, balance_usd, timestamp, category)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![row.address, row.token, row.balance, row.balance_usd, row.timestamp, row.category])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_btc_wallets(&mut self, rows: &[BtcWalletRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO btc_wallets (address, balance_btc, balance_usd, timestamp, category)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![row.address, row.balance_btc, row.balance_usd, row.timestamp, row.category])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_transactions(&mut self, rows: &[TransactionRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions (address, tx_hash, value, value_usd, date, timestamp, category,
                     source_address, destination_address, confirmed, token_symbol)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.address,
                    row.tx_hash,
                    row.value,
                    row.value_usd,
                    row.date,
                    row.timestamp,
                    row.category,
                    row.source_address,
                    row.destination_address,
                    row.confirmed,
                    row.token_symbol,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_staking_pool(&self, row: &StakingPoolRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO liquid_staking_pools (pool_name, total_eth_deposited, eth_staked, eth_unstaked, staking_rewards, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.pool_name,
                row.total_eth_deposited,
                row.eth_staked,
                row.eth_unstaked,
                row.staking_rewards,
                row.timestamp
            ],
        )?;
        Ok(())
    }

    pub fn insert_staking_queues(&mut self, rows: &[StakingQueueRow], timestamp: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO eth_staking_queues (queue_type, eth_amount, avg_wait_time, timestamp) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(params![row.queue_type, row.eth_amount, row.avg_wait_time, timestamp])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_staking_ratio(&self, row: &StakingRatioRow) -> Result<()> {
        self.conn.execute(
            "INSERT INTO eth_staking_ratio (date, staking_ratio, avg_rewards, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![row.date, row.staking_ratio, row.avg_rewards, row.timestamp],
        )?;
        Ok(())
    }

    pub fn insert_arkham_balances(&mut self, rows: &[ArkhamBalanceRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO arkham_wallets (entity_id, token, balance, balance_usd, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![row.entity_id, row.token, row.balance, row.balance_usd, row.timestamp])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Arkham snapshots of `entity` for `tokens` with `start <= timestamp <= end`,
    /// oldest first. Bounds compare as `YYYY-MM-DD HH:MM:SS` text.
    pub fn entity_balances(&self, entity: &str, tokens: &[&str], start: &str, end: &str) -> Result<Vec<ArkhamBalanceRow>> {
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; tokens.len()].join(", ");
        let sql = format!(
            "SELECT entity_id, token, balance, balance_usd, timestamp FROM arkham_wallets
             WHERE entity_id = ? AND token IN ({}) AND timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp",
            placeholders
        );

        let mut values: Vec<&str> = Vec::with_capacity(tokens.len() + 3);
        values.push(entity);
        values.extend_from_slice(tokens);
        values.push(start);
        values.push(end);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok(ArkhamBalanceRow {
                entity_id: row.get(0)?,
                token: row.get(1)?,
                balance: row.get(2)?,
                balance_usd: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?;
        let rows = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        info!("Queried {} balance entries for {} from {} to {}", rows.len(), entity, start, end);
        Ok(rows)
    }

    #[cfg(test)]
    pub(crate) fn count(&self, table: &str) -> i64 {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }
}
