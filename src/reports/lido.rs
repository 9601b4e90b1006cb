use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use super::{or_default, ReportContext};
use crate::dates::DATE_FORMAT;
use crate::error::Result;
use crate::sources::{CmcQuote, NewsArticle};
use crate::storage::{Database, StakingPoolRow, StakingQueueRow, StakingRatioRow};

const STETH_CMC_ID: u32 = 8085;
const WSTETH_CMC_ID: u32 = 12409;
const ETH_CMC_ID: u32 = 1027;

const LIDO_CONTRACT: &str = "0xae7ab96520DE3A18E5e111B5EaAb095312D7fE84";
/// Contract balances at or below this are treated as bad reads.
const MIN_PLAUSIBLE_UNSTAKED: f64 = 10_000.0;
const DEFAULT_UNSTAKED: f64 = 87_479.0;
/// Percent.
const DEFAULT_APR: f64 = 3.5;
const ETH_PER_VALIDATOR: f64 = 32.0;
const AVG_QUEUE_WAIT_SECS: f64 = 5.58 * 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolMarket {
    pub total_eth_deposited: f64,
    pub eth_staked: f64,
    pub eth_unstaked: f64,
    pub staking_rewards: f64,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LidoMarkets {
    #[serde(rename = "stETH")]
    pub steth: PoolMarket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LidoYields {
    /// Percent.
    pub avg_rewards: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakingAnalytics {
    pub staking_ratio: f64,
    pub queues: Vec<StakingQueueRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LidoReport {
    pub markets: LidoMarkets,
    pub yields: LidoYields,
    pub analytics: StakingAnalytics,
    pub charts: Vec<Value>,
    pub news: Vec<NewsArticle>,
}

struct Quotes {
    steth: CmcQuote,
    wsteth: CmcQuote,
    eth: CmcQuote,
}

impl Quotes {
    /// stETH supply plus wstETH supply converted at the wstETH/stETH price ratio.
    fn eth_staked(&self) -> f64 {
        self.steth.circulating_supply + self.wsteth.circulating_supply * (self.wsteth.price / self.steth.price)
    }
}

/// Lido pool size, validator queues and the network staking ratio.
pub async fn lido_report(ctx: &ReportContext, db: &mut Database) -> Result<LidoReport> {
    info!("=== Fetching Lido staking data ===");
    let timestamp = ctx.timestamp();

    let quotes = fetch_quotes(ctx).await;
    let apr = match ctx.lido_api().steth_apr().await {
        Ok(apr) => {
            info!("APR from Lido: {}%", apr);
            Some(apr)
        }
        Err(e) => {
            warn!("Could not fetch APR from the Lido API, using {}%: {}", DEFAULT_APR, e);
            None
        }
    };
    let apr = apr.unwrap_or(DEFAULT_APR);

    let pool = match &quotes {
        Some(quotes) => Some(pool_row(ctx, quotes, apr, &timestamp).await),
        None => None,
    };
    if let Some(pool) = &pool {
        db.insert_staking_pool(pool)?;
    }

    let queues = or_default(
        ctx.beaconchain().validator_queue().await.map(|queue| {
            vec![
                StakingQueueRow {
                    queue_type: "stake".to_string(),
                    eth_amount: queue.entering as f64 * ETH_PER_VALIDATOR,
                    avg_wait_time: AVG_QUEUE_WAIT_SECS,
                },
                StakingQueueRow {
                    queue_type: "unstake".to_string(),
                    eth_amount: queue.exiting as f64 * ETH_PER_VALIDATOR,
                    avg_wait_time: AVG_QUEUE_WAIT_SECS,
                },
            ]
        }),
        "staking queues from Beaconchain",
        Vec::new(),
    );
    if !queues.is_empty() {
        db.insert_staking_queues(&queues, &timestamp)?;
    }

    let ratio = quotes.as_ref().map(|quotes| StakingRatioRow {
        date: ctx.now.format(DATE_FORMAT).to_string(),
        staking_ratio: quotes.eth_staked() / quotes.eth.circulating_supply,
        avg_rewards: apr / 100.0,
        timestamp: timestamp.clone(),
    });
    if let Some(ratio) = &ratio {
        info!("Staking ratio: {}", ratio.staking_ratio);
        db.insert_staking_ratio(ratio)?;
    }

    let steth = match pool {
        Some(pool) => PoolMarket {
            total_eth_deposited: pool.total_eth_deposited,
            eth_staked: pool.eth_staked,
            eth_unstaked: pool.eth_unstaked,
            staking_rewards: pool.staking_rewards,
            last_updated: pool.timestamp,
        },
        None => PoolMarket {
            total_eth_deposited: 0.0,
            eth_staked: 0.0,
            eth_unstaked: 0.0,
            staking_rewards: 0.0,
            last_updated: timestamp,
        },
    };

    Ok(LidoReport {
        markets: LidoMarkets { steth },
        yields: LidoYields {
            avg_rewards: ratio.as_ref().map_or(DEFAULT_APR, |ratio| ratio.avg_rewards * 100.0),
        },
        analytics: StakingAnalytics {
            staking_ratio: ratio.as_ref().map_or(0.0, |ratio| ratio.staking_ratio),
            queues,
        },
        charts: Vec::new(),
        news: Vec::new(),
    })
}

/// stETH, wstETH and ETH quotes, with ETH supply taken from Etherscan when
/// it reports one. `None` unless all three quotes are usable.
async fn fetch_quotes(ctx: &ReportContext) -> Option<Quotes> {
    let cmc = ctx.coinmarketcap();
    let (steth, wsteth, eth) = tokio::join!(
        cmc.quote(STETH_CMC_ID, "STETH"),
        cmc.quote(WSTETH_CMC_ID, "WSTETH"),
        cmc.quote(ETH_CMC_ID, "ETH"),
    );

    let mut quotes = match (steth, wsteth, eth) {
        (Ok(steth), Ok(wsteth), Ok(eth)) => Quotes { steth, wsteth, eth },
        (steth, wsteth, eth) => {
            for (symbol, result) in [("STETH", steth), ("WSTETH", wsteth), ("ETH", eth)] {
                if let Err(e) = result {
                    warn!("Failed to fetch {} quote from CoinMarketCap: {}", symbol, e);
                }
            }
            warn!("Could not get quotes for STETH, WSTETH and ETH");
            return None;
        }
    };

    match ctx.staking_etherscan().eth_supply().await {
        Ok(supply) if supply > 0.0 => {
            info!("Using Etherscan supply for ETH: {}", supply);
            quotes.eth.circulating_supply = supply;
        }
        Ok(supply) => warn!("Ignoring Etherscan ETH supply of {}", supply),
        Err(e) => warn!("ETH supply from Etherscan unavailable, keeping CoinMarketCap's: {}", e),
    }
    Some(quotes)
}

async fn pool_row(ctx: &ReportContext, quotes: &Quotes, apr: f64, timestamp: &str) -> StakingPoolRow {
    let eth_staked = quotes.eth_staked();
    let eth_unstaked = match ctx.staking_etherscan().eth_balance(LIDO_CONTRACT).await {
        Ok(balance) if balance > MIN_PLAUSIBLE_UNSTAKED => balance,
        Ok(balance) => {
            warn!("Lido contract balance {} looks too low, using {}", balance, DEFAULT_UNSTAKED);
            DEFAULT_UNSTAKED
        }
        Err(e) => {
            warn!("Lido contract balance unavailable, using {}: {}", DEFAULT_UNSTAKED, e);
            DEFAULT_UNSTAKED
        }
    };

    let row = StakingPoolRow {
        pool_name: "Lido".to_string(),
        total_eth_deposited: eth_staked + eth_unstaked,
        eth_staked,
        eth_unstaked,
        staking_rewards: eth_staked * apr / 100.0,
        timestamp: timestamp.to_string(),
    };
    info!("Lido data: {:?}", row);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::ApiKeys;
    use crate::http::ApiRequest;
    use crate::reports::testing;
    use serde_json::json;
    use tempfile::tempdir;
    use zeroize::Zeroizing;

    fn keys() -> ApiKeys {
        ApiKeys {
            etherscan: Some(Zeroizing::new("etherscan".to_string())),
            coinmarketcap: Some(Zeroizing::new("cmc".to_string())),
            ..ApiKeys::default()
        }
    }

    fn cmc_quote(id: &str, supply: f64, price: f64) -> Value {
        json!({"data": {(id): {"circulating_supply": supply, "quote": {"USD": {"price": price}}}}})
    }

    fn route(req: &ApiRequest) -> Option<Value> {
        if req.url.contains("coinmarketcap") {
            return match req.params.get("id")?.as_str() {
                "8085" => Some(cmc_quote("8085", 9_000_000.0, 2_500.0)),
                "12409" => Some(cmc_quote("12409", 3_000_000.0, 3_000.0)),
                "1027" => Some(cmc_quote("1027", 119_000_000.0, 2_500.0)),
                _ => None,
            };
        }
        if req.url.contains("etherscan") {
            let result = match req.params.get("action")?.as_str() {
                "ethsupply" => "120000000000000000000000000",
                // 5,000 ETH: implausibly low
                "balance" => "5000000000000000000000",
                _ => return None,
            };
            return Some(json!({"status": "1", "message": "OK", "result": result}));
        }
        if req.url.contains("lido.fi") {
            return Some(json!({"data": {"apr": 2.5}}));
        }
        if req.url.contains("beaconcha.in") {
            return Some(json!({"data": {"beaconchain_entering": 100, "beaconchain_exiting": 50}}));
        }
        None
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    #[tokio::test]
    async fn test_lido_report() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), keys(), route);
        let mut db = Database::open_in_memory().unwrap();

        let report = lido_report(&ctx, &mut db).await.unwrap();

        let steth = &report.markets.steth;
        assert!(approx(steth.eth_staked, 12_600_000.0));
        assert_eq!(steth.eth_unstaked, DEFAULT_UNSTAKED);
        assert!(approx(steth.total_eth_deposited, 12_687_479.0));
        assert!(approx(steth.staking_rewards, 315_000.0));
        assert_eq!(steth.last_updated, "2025-06-05 12:00:00");

        // supply comes from Etherscan, not CMC
        assert!(approx(report.analytics.staking_ratio, 0.105));
        assert!(approx(report.yields.avg_rewards, 2.5));
        assert_eq!(report.analytics.queues[0].eth_amount, 3_200.0);
        assert_eq!(report.analytics.queues[1].eth_amount, 1_600.0);
        assert!(approx(report.analytics.queues[1].avg_wait_time, 482_112.0));

        assert_eq!(db.count("liquid_staking_pools"), 1);
        assert_eq!(db.count("eth_staking_queues"), 2);
        assert_eq!(db.count("eth_staking_ratio"), 1);

        let value = serde_json::to_value(&report).unwrap();
        for key in ["markets", "yields", "analytics", "charts", "news"] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert!(value["markets"]["stETH"].is_object());
    }

    #[tokio::test]
    async fn test_without_keys_falls_back() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |_| None);
        let mut db = Database::open_in_memory().unwrap();

        let report = lido_report(&ctx, &mut db).await.unwrap();

        assert_eq!(report.markets.steth.eth_staked, 0.0);
        assert_eq!(report.yields.avg_rewards, DEFAULT_APR);
        assert_eq!(report.analytics.staking_ratio, 0.0);
        assert!(report.analytics.queues.is_empty());
        assert_eq!(db.count("liquid_staking_pools"), 0);
    }
}
