use std::collections::BTreeMap;

use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;

use super::{or_default, ReportContext};
use crate::dates::{from_unix_secs, DateRange, DATETIME_FORMAT};
use crate::error::Result;
use crate::market::Yields;
use crate::sources::{ChartPoint, EtherscanClient, EtherscanTx, MempoolClient, NewsArticle, QuoteStats};
use crate::storage::{BtcWalletRow, Database, EthWalletRow, TransactionRow};

const ETFS: [&str; 2] = ["IBIT", "ETHA"];
const NEWS_QUERY: &str = "BlackRock OR IBIT OR ETHA";
const NEWS_PAGE_SIZE: u32 = 5;

const USDC_CONTRACT: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";
const USDC_DECIMALS: u32 = 6;
const ETH_DECIMALS: u32 = 18;

struct TrackedWallet {
    address: &'static str,
    category: &'static str,
}

const ETH_WALLETS: [TrackedWallet; 2] = [
    TrackedWallet {
        address: "0x5a52e96bacdabb82fd05763e25335261b270efcb",
        category: "ETHA Ethereum ETF",
    },
    TrackedWallet {
        address: "0x28c6c06298d514db089934071355e5743bf21d60",
        category: "Coinbase ETH",
    },
];

const BTC_WALLETS: [TrackedWallet; 2] = [
    TrackedWallet {
        address: "bc1qm34lsc65zpw79lxujrvu0xmk5f0g42r94v5j0",
        category: "IBIT Bitcoin ETF",
    },
    TrackedWallet {
        address: "3EyjqW72h5H5aXG3NU6T3cT3cBT2uDX2T",
        category: "Coinbase BTC",
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtfMarket {
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub percent_change_24h: f64,
    pub percent_change_7d: f64,
    pub percent_change_30d: f64,
    pub last_updated: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TransferVolume {
    pub sent: f64,
    pub received: f64,
}

impl TransferVolume {
    fn of<'a>(txs: impl Iterator<Item = &'a TransactionRow>) -> Self {
        txs.fold(Self::default(), |mut volume, tx| {
            if tx.is_outgoing() {
                volume.sent += tx.value;
            }
            if tx.is_incoming() {
                volume.received += tx.value;
            }
            volume
        })
    }

    pub fn net(&self) -> f64 {
        self.received - self.sent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletAnalytics {
    pub holdings_by_category: BTreeMap<String, BTreeMap<String, f64>>,
    pub btc_transaction_volume: TransferVolume,
    pub eth_transaction_volume: BTreeMap<String, TransferVolume>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ByChain<E, B> {
    #[serde(rename = "ETH")]
    pub eth: E,
    #[serde(rename = "BTC")]
    pub btc: B,
}

/// IBIT/ETHA market view plus on-chain activity of the tracked wallets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlackrockReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub charts: BTreeMap<String, Vec<ChartPoint>>,
    pub markets: BTreeMap<String, EtfMarket>,
    pub yields: BTreeMap<String, Yields>,
    pub news: Vec<NewsArticle>,
    pub analytics: WalletAnalytics,
    pub wallets: ByChain<Vec<EthWalletRow>, Vec<BtcWalletRow>>,
    pub transactions: ByChain<Vec<TransactionRow>, Vec<TransactionRow>>,
    pub analysis: String,
    pub conclusion: String,
}

pub async fn blackrock_report(ctx: &ReportContext, db: &mut Database, range: &DateRange) -> Result<BlackrockReport> {
    info!("Fetching BlackRock data for IBIT and ETHA from {} to {}", range.start_str(), range.end_str());
    let yahoo = ctx.yahoo();

    let mut charts = BTreeMap::new();
    let mut markets = BTreeMap::new();
    let mut yields = BTreeMap::new();
    let last_updated = ctx.now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string();

    for ticker in ETFS {
        let history = or_default(
            yahoo.daily_history(ticker, range).await,
            &format!("historical data for {}", ticker),
            Vec::new(),
        );
        let history = if history.is_empty() {
            warn!("No historical data for {}", ticker);
            vec![ChartPoint {
                date: range.start_str(),
                price: 0.0,
                volume: 0,
            }]
        } else {
            info!("Historical data for {} obtained - Dates: {}", ticker, history.len());
            history
        };
        charts.insert(ticker.to_string(), history);

        let stats = or_default(
            yahoo.quote_stats(ticker).await,
            &format!("market stats for {}", ticker),
            QuoteStats::default(),
        );
        yields.insert(
            ticker.to_string(),
            Yields {
                percent_change_24h: stats.percent_change_24h,
                percent_change_7d: stats.percent_change_7d,
                percent_change_30d: 0.0,
            },
        );
        markets.insert(
            ticker.to_string(),
            EtfMarket {
                price: stats.price,
                volume_24h: stats.volume_24h,
                market_cap: stats.market_cap,
                percent_change_24h: stats.percent_change_24h,
                percent_change_7d: stats.percent_change_7d,
                percent_change_30d: 0.0,
                last_updated: last_updated.clone(),
            },
        );
    }

    let news = or_default(
        ctx.newsapi().latest(NEWS_QUERY, NEWS_PAGE_SIZE).await,
        "news for BlackRock, IBIT and ETHA",
        Vec::new(),
    );

    let btc_price = or_default(yahoo.spot_price("BTC-USD").await, "BTC price", 0.0);
    let eth_price = or_default(yahoo.spot_price("ETH-USD").await, "ETH price", 0.0);
    info!("Current prices: BTC ${}, ETH ${}", btc_price, eth_price);

    let timestamp = ctx.timestamp();

    let etherscan = ctx.etherscan();
    let eth_results = join_all(
        ETH_WALLETS
            .iter()
            .map(|wallet| eth_wallet(&etherscan, wallet, range, eth_price, &timestamp)),
    )
    .await;
    let mut eth_wallets = Vec::new();
    let mut eth_transactions = Vec::new();
    for (rows, txs) in eth_results {
        eth_wallets.extend(rows);
        eth_transactions.extend(txs);
    }
    db.insert_eth_wallets(&eth_wallets)?;
    db.insert_transactions(&eth_transactions)?;
    info!("[ETH] {} records inserted | {} transactions inserted", eth_wallets.len(), eth_transactions.len());

    let mempool = ctx.mempool();
    let btc_results = join_all(
        BTC_WALLETS
            .iter()
            .map(|wallet| btc_wallet(&mempool, wallet, range, btc_price, &timestamp)),
    )
    .await;
    let mut btc_wallets = Vec::new();
    let mut btc_transactions = Vec::new();
    for (row, txs) in btc_results {
        btc_wallets.push(row);
        btc_transactions.extend(txs);
    }
    db.insert_btc_wallets(&btc_wallets)?;
    db.insert_transactions(&btc_transactions)?;
    info!("[BTC] {} wallets | {} transactions inserted", btc_wallets.len(), btc_transactions.len());

    let analytics = wallet_analytics(&eth_wallets, &btc_wallets, &eth_transactions, &btc_transactions);
    let ibit_change = markets.get("IBIT").map_or(0.0, |m| m.percent_change_24h);
    let etha_change = markets.get("ETHA").map_or(0.0, |m| m.percent_change_24h);
    let btc_net = analytics.btc_transaction_volume.net();
    let eth_net = analytics.eth_transaction_volume.get("ETH").map_or(0.0, TransferVolume::net);

    Ok(BlackrockReport {
        kind: "result",
        charts,
        markets,
        yields,
        news,
        analysis: etf_analysis(ibit_change, etha_change, btc_net, eth_net),
        conclusion: etf_conclusion(ibit_change, etha_change, btc_net, eth_net),
        analytics,
        wallets: ByChain {
            eth: eth_wallets,
            btc: btc_wallets,
        },
        transactions: ByChain {
            eth: eth_transactions,
            btc: btc_transactions,
        },
    })
}

/// ETH and USDC balances plus in-range transfers of one wallet.
async fn eth_wallet(
    etherscan: &EtherscanClient,
    wallet: &TrackedWallet,
    range: &DateRange,
    eth_price: f64,
    timestamp: &str,
) -> (Vec<EthWalletRow>, Vec<TransactionRow>) {
    info!("[ETH] Fetching data for {} via Etherscan", wallet.address);
    let (eth_balance, usdc_balance, txs, token_txs) = tokio::join!(
        etherscan.eth_balance(wallet.address),
        etherscan.token_balance(USDC_CONTRACT, wallet.address, USDC_DECIMALS),
        etherscan.tx_list(wallet.address),
        etherscan.token_tx_list(USDC_CONTRACT, wallet.address),
    );

    let eth_balance = or_default(eth_balance, &format!("ETH balance for {}", wallet.address), 0.0);
    let usdc_balance = or_default(usdc_balance, &format!("USDC balance for {}", wallet.address), 0.0);
    let snapshot = |token: &str, balance: f64, balance_usd: f64| EthWalletRow {
        address: wallet.address.to_string(),
        token: token.to_string(),
        balance,
        balance_usd,
        timestamp: timestamp.to_string(),
        category: wallet.category.to_string(),
    };
    let rows = vec![
        snapshot("ETH", eth_balance, eth_balance * eth_price),
        snapshot("USDC", usdc_balance, usdc_balance),
    ];

    let txs = or_default(txs, &format!("ETH transactions for {}", wallet.address), Vec::new());
    let token_txs = or_default(token_txs, &format!("ERC20 transactions for {}", wallet.address), Vec::new());
    let mut transactions = etherscan_rows(&txs, wallet, "ETH", ETH_DECIMALS, eth_price, range, timestamp);
    info!("[ETH] Fetched {} ETH transactions for {} in date range", transactions.len(), wallet.address);
    let usdc = etherscan_rows(&token_txs, wallet, "USDC", USDC_DECIMALS, 1.0, range, timestamp);
    info!("[ETH] Fetched {} ERC20 transactions for {} in date range", usdc.len(), wallet.address);
    transactions.extend(usdc);

    (rows, transactions)
}

fn etherscan_rows(
    txs: &[EtherscanTx],
    wallet: &TrackedWallet,
    token: &str,
    decimals: u32,
    usd_price: f64,
    range: &DateRange,
    timestamp: &str,
) -> Vec<TransactionRow> {
    txs.iter()
        .filter_map(|tx| {
            let at = from_unix_secs(tx.timestamp()?)?;
            if !range.contains(at) {
                return None;
            }
            let value = match tx.amount(decimals) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping {} transfer {}: {}", token, tx.hash, e);
                    return None;
                }
            };
            Some(TransactionRow {
                address: wallet.address.to_string(),
                tx_hash: tx.hash.clone(),
                value,
                value_usd: value * usd_price,
                date: at.format(DATETIME_FORMAT).to_string(),
                timestamp: timestamp.to_string(),
                category: wallet.category.to_string(),
                source_address: tx.from.clone(),
                destination_address: tx.to.clone(),
                confirmed: tx.is_mined(),
                token_symbol: token.to_string(),
            })
        })
        .collect()
}

/// Mempool balance and confirmed in-range transactions of one wallet.
async fn btc_wallet(
    mempool: &MempoolClient,
    wallet: &TrackedWallet,
    range: &DateRange,
    btc_price: f64,
    timestamp: &str,
) -> (BtcWalletRow, Vec<TransactionRow>) {
    info!("[BTC] Fetching data for {} via Mempool.space", wallet.address);
    let (balance, txs) = tokio::join!(mempool.address_balance(wallet.address), mempool.address_txs(wallet.address));

    let balance_btc = or_default(balance, &format!("balance for {}", wallet.address), 0.0);
    let row = BtcWalletRow {
        address: wallet.address.to_string(),
        balance_btc,
        balance_usd: balance_btc * btc_price,
        timestamp: timestamp.to_string(),
        category: wallet.category.to_string(),
    };

    let transactions: Vec<TransactionRow> = or_default(txs, &format!("transactions for {}", wallet.address), Vec::new())
        .iter()
        .filter(|tx| tx.status.confirmed)
        .filter_map(|tx| {
            let at = from_unix_secs(tx.status.block_time?)?;
            if !range.contains(at) {
                return None;
            }
            let value = tx.output_btc();
            Some(TransactionRow {
                address: wallet.address.to_string(),
                tx_hash: tx.txid.clone(),
                value,
                value_usd: value * btc_price,
                date: at.format(DATETIME_FORMAT).to_string(),
                timestamp: timestamp.to_string(),
                category: wallet.category.to_string(),
                source_address: wallet.address.to_string(),
                destination_address: tx.first_recipient().unwrap_or("unknown").to_string(),
                confirmed: true,
                token_symbol: "BTC".to_string(),
            })
        })
        .collect();
    info!("[BTC] Fetched {} BTC transactions for {} in date range", transactions.len(), wallet.address);

    (row, transactions)
}

fn wallet_analytics(
    eth_wallets: &[EthWalletRow],
    btc_wallets: &[BtcWalletRow],
    eth_transactions: &[TransactionRow],
    btc_transactions: &[TransactionRow],
) -> WalletAnalytics {
    let mut holdings: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for wallet in btc_wallets {
        *holdings
            .entry(wallet.category.clone())
            .or_insert_with(|| BTreeMap::from([("BTC".to_string(), 0.0)]))
            .entry("BTC".to_string())
            .or_insert(0.0) += wallet.balance_btc;
    }
    for wallet in eth_wallets {
        *holdings
            .entry(wallet.category.clone())
            .or_insert_with(|| BTreeMap::from([("ETH".to_string(), 0.0), ("USDC".to_string(), 0.0)]))
            .entry(wallet.token.clone())
            .or_insert(0.0) += wallet.balance;
    }
    info!("Total holdings by category: {:?}", holdings);

    let btc_volume = TransferVolume::of(btc_transactions.iter());
    let eth_volume: BTreeMap<String, TransferVolume> = ["ETH", "USDC"]
        .iter()
        .map(|token| {
            let volume = TransferVolume::of(eth_transactions.iter().filter(|tx| tx.token_symbol == *token));
            info!("{} transaction volume: sent {}, received {}", token, volume.sent, volume.received);
            (token.to_string(), volume)
        })
        .collect();
    info!("BTC transaction volume: sent {}, received {}", btc_volume.sent, btc_volume.received);

    WalletAnalytics {
        holdings_by_category: holdings,
        btc_transaction_volume: btc_volume,
        eth_transaction_volume: eth_volume,
    }
}

fn direction(change: f64) -> &'static str {
    if change > 0.0 {
        "rising"
    } else {
        "declining"
    }
}

fn flow_reading(net: f64) -> (&'static str, &'static str) {
    if net >= 0.0 {
        ("positive", "accumulation")
    } else {
        ("negative", "selling pressure")
    }
}

fn etf_analysis(ibit_change: f64, etha_change: f64, btc_net: f64, eth_net: f64) -> String {
    let (btc_sign, btc_meaning) = flow_reading(btc_net);
    let (eth_sign, eth_meaning) = flow_reading(eth_net);
    format!(
        "IBIT price {} ({:.2}% in 24h), ETHA price {} ({:.2}% in 24h). \
         BTC net flow {} ({:.2} BTC), indicating {}. \
         ETH net flow {} ({:.2} ETH), indicating {}.",
        direction(ibit_change),
        ibit_change,
        direction(etha_change),
        etha_change,
        btc_sign,
        btc_net,
        btc_meaning,
        eth_sign,
        eth_net,
        eth_meaning,
    )
}

fn etf_conclusion(ibit_change: f64, etha_change: f64, btc_net: f64, eth_net: f64) -> String {
    let ibit = if ibit_change < 0.0 && btc_net < 0.0 {
        "IBIT declining with negative BTC net flow; potential bearish pressure on Bitcoin ETF."
    } else if ibit_change > 0.0 && btc_net >= 0.0 {
        "IBIT rising with positive BTC net flow; potential bullish trend for Bitcoin ETF."
    } else {
        "Mixed signals for IBIT; monitor BTC flows for trend confirmation."
    };
    let etha = if etha_change < 0.0 && eth_net < 0.0 {
        "ETHA declining with negative ETH net flow; potential bearish pressure on Ethereum ETF."
    } else if etha_change > 0.0 && eth_net >= 0.0 {
        "ETHA rising with positive ETH net flow; potential bullish trend for Ethereum ETF."
    } else {
        "Mixed signals for ETHA; monitor ETH flows for trend confirmation."
    };
    format!("{} {}", ibit, etha)
}
