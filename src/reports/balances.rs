use log::info;
use serde::Serialize;

use crate::dates::DateRange;
use crate::error::Result;
use crate::storage::{ArkhamBalanceRow, Database};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub timestamp: String,
    pub balance: f64,
    pub balance_usd: f64,
}

impl From<ArkhamBalanceRow> for BalancePoint {
    fn from(row: ArkhamBalanceRow) -> Self {
        Self {
            timestamp: row.timestamp,
            balance: row.balance,
            balance_usd: row.balance_usd,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceSeries {
    #[serde(rename = "BTC")]
    pub btc: Vec<BalancePoint>,
    #[serde(rename = "ETH")]
    pub eth: Vec<BalancePoint>,
}

/// Stored Arkham BTC and ETH balances of `entity` over whole days of `range`.
pub fn balances_report(db: &Database, entity: &str, range: &DateRange) -> Result<BalanceSeries> {
    let start = format!("{} 00:00:00", range.start_str());
    let end = format!("{} 23:59:59", range.end_str());

    let mut series = BalanceSeries::default();
    for row in db.entity_balances(entity, &["BTC", "ETH"], &start, &end)? {
        match row.token.as_str() {
            "BTC" => series.btc.push(row.into()),
            "ETH" => series.eth.push(row.into()),
            _ => {}
        }
    }
    info!("Formatted data: {} BTC entries, {} ETH entries", series.btc.len(), series.eth.len());
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::testing;

    fn row(token: &str, timestamp: &str, balance: f64) -> ArkhamBalanceRow {
        ArkhamBalanceRow {
            entity_id: "blackrock".into(),
            token: token.into(),
            balance,
            balance_usd: balance * 10.0,
            timestamp: timestamp.into(),
        }
    }

    #[test]
    fn test_series_cover_whole_end_day() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_arkham_balances(&[
            row("BTC", "2025-06-05 23:59:59", 3.0),
            row("ETH", "2025-06-01 00:00:00", 2.0),
            row("BTC", "2025-06-02 08:00:00", 1.0),
            row("USDC", "2025-06-03 00:00:00", 9.0),
            row("ETH", "2025-05-31 23:59:59", 7.0),
        ])
        .unwrap();
        let range = DateRange::resolve(Some("2025-06-01"), Some("2025-06-05"), 35, testing::now()).unwrap();

        let series = balances_report(&db, "blackrock", &range).unwrap();

        let btc: Vec<f64> = series.btc.iter().map(|p| p.balance).collect();
        assert_eq!(btc, vec![1.0, 3.0]);
        assert_eq!(series.eth.len(), 1);
        assert_eq!(series.eth[0].balance_usd, 20.0);

        let value = serde_json::to_value(&series).unwrap();
        assert!(value["BTC"].is_array());
        assert!(value["ETH"][0].get("token").is_none());
    }

    #[test]
    fn test_unknown_entity_is_empty() {
        let db = Database::open_in_memory().unwrap();
        let range = DateRange::resolve(None, None, 35, testing::now()).unwrap();
        assert_eq!(balances_report(&db, "nobody", &range).unwrap(), BalanceSeries::default());
    }
}
