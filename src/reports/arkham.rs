use log::info;
use serde::Serialize;

use super::ReportContext;
use crate::error::Result;
use crate::sources::TokenBalance;
use crate::storage::{ArkhamBalanceRow, Database};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArkhamReport {
    pub entity: String,
    pub timestamp: String,
    pub balances: Vec<TokenBalance>,
}

/// Snapshot an entity's Arkham balances into `arkham_wallets`. Fails when
/// Arkham is unreachable instead of storing zeros.
pub async fn arkham_report(ctx: &ReportContext, db: &mut Database, entity: &str) -> Result<ArkhamReport> {
    info!("Fetching Arkham balances for {}", entity);
    let balances = ctx.arkham().entity_balances(entity).await?;
    let timestamp = ctx.timestamp();

    let rows: Vec<ArkhamBalanceRow> = balances
        .iter()
        .map(|balance| ArkhamBalanceRow {
            entity_id: entity.to_string(),
            token: balance.token.clone(),
            balance: balance.balance,
            balance_usd: balance.balance_usd,
            timestamp: timestamp.clone(),
        })
        .collect();
    db.insert_arkham_balances(&rows)?;
    info!("Inserted {} Arkham balances for {}", rows.len(), entity);

    Ok(ArkhamReport {
        entity: entity.to_string(),
        timestamp,
        balances,
    })
}
