use chrono::Duration;
use log::{info, warn};

use super::coin::{CoinParts, CoinReport, Spot};
use super::{or_default, ReportContext};
use crate::dates::{from_unix_ms, from_unix_secs, DateRange, DATETIME_FORMAT};
use crate::error::Result;
use crate::http::FetchError;
use crate::market::{support_from_closes, Candle, FeeSeries, FlowTotals, Markets, PriceHistory, TopFlow, Yields};
use crate::sources::{CoinMarketData, MempoolTx, LARGE_TX_USD};
use crate::storage::{BtcPriceRow, Database};
use crate::whale::{DetectorConfig, WhaleDetector};

const SYMBOL: &str = "BTCUSDT";
const PRICE_TICKER: &str = "BTC-USD";
/// Typical transaction size used to price the fee estimate.
const TX_VBYTES: f64 = 250.0;
const WHALE_WINDOW_DAYS: i64 = 5;
const TOP_FLOWS: usize = 5;

pub async fn bitcoin_report(ctx: &ReportContext, db: &mut Database, range: &DateRange) -> Result<CoinReport> {
    info!("Fetching data from {} to {}", range.start_str(), range.end_str());
    let binance = ctx.binance();

    let candles = or_default(
        binance.klines(SYMBOL, "1d", Some(range.start_ms()), Some(range.end_ms()), 1000).await,
        "historical data from Binance",
        Vec::new(),
    );
    let price_rows: Vec<BtcPriceRow> = candles
        .iter()
        .map(|candle| BtcPriceRow {
            ticker: PRICE_TICKER.to_string(),
            date: candle.date(),
            price_usd: candle.close,
        })
        .collect();
    db.replace_btc_prices(&price_rows)?;

    let spot = or_default(binance.ticker_24h(SYMBOL).await.map(Spot::from), "spot data from Binance", Spot::default());
    let markets = market_data(ctx, &spot).await;

    let avg_fee = or_default(ctx.mempool().recommended_fees().await, "fees from Mempool.space", Default::default())
        .average();
    let fees = daily_fees(&candles, avg_fee);

    let top_flows = whale_flows(ctx, spot.price).await;

    let flows = match binance.agg_trades(SYMBOL, 1000).await {
        Ok(trades) => FlowTotals::from_agg_trades(&trades, spot.price),
        Err(e) => {
            warn!("Failed to fetch aggTrades from Binance, keeping flows at 0: {}", e);
            FlowTotals::default()
        }
    };

    let yields = Yields {
        percent_change_24h: markets.percent_change_24h,
        percent_change_7d: markets.percent_change_7d.unwrap_or(0.0),
        percent_change_30d: markets.percent_change_30d.unwrap_or(0.0),
    };

    info!("fetch_bitcoin_data completed");
    Ok(CoinReport::assemble(CoinParts {
        markets,
        yields,
        flows,
        top_flows,
        fees,
        price_history: PriceHistory::from_candles(&candles),
        support: support_from_closes(&candles),
        unit: "BTC",
        timestamp: ctx.iso_timestamp(),
    }))
}

async fn market_data(ctx: &ReportContext, spot: &Spot) -> Markets {
    let coingecko = ctx.coingecko();
    let mut data = or_default(
        coingecko.coin_market_data("bitcoin").await,
        "current data from CoinGecko",
        CoinMarketData {
            last_updated: "N/A".to_string(),
            ..CoinMarketData::default()
        },
    );

    if data.market_dominance == 0.0 {
        match coingecko.global_market_cap_usd().await {
            Ok(total) if total > 0.0 => {
                data.market_dominance = data.market_cap / total * 100.0;
                info!("Market dominance calculated: {}%", data.market_dominance);
            }
            Ok(_) => warn!("Global market cap is 0, keeping dominance at 0"),
            Err(e) => warn!("Unable to calculate market dominance: {}", e),
        }
    }

    let fdv = if data.max_supply > 0.0 {
        spot.price * data.max_supply
    } else {
        data.market_cap
    };

    Markets {
        price: spot.price,
        volume_24h: spot.volume_24h,
        market_cap: data.market_cap,
        fdv: Some(fdv),
        current_supply: Some(data.circulating_supply),
        max_supply: Some(data.max_supply),
        percent_change_24h: spot.percent_change_24h,
        percent_change_7d: Some(data.percent_change_7d),
        percent_change_30d: Some(data.percent_change_30d),
        market_dominance: Some(data.market_dominance),
        last_updated: data.last_updated,
    }
}

/// USD cost of a typical transaction per day at today's fee rate.
fn daily_fees(candles: &[Candle], avg_sat_per_vbyte: f64) -> FeeSeries {
    let mut fees = FeeSeries::default();
    for candle in candles {
        let fee_btc = avg_sat_per_vbyte * TX_VBYTES / 1e8;
        fees.dates.push(candle.date());
        fees.values.push(if candle.close > 0.0 { fee_btc * candle.close } else { 0.0 });
    }
    fees
}

/// Whale events from recent hourly candles, else large on-chain transactions.
async fn whale_flows(ctx: &ReportContext, price: f64) -> Vec<TopFlow> {
    let end = ctx.now;
    let start = end - Duration::days(WHALE_WINDOW_DAYS);
    let hourly = ctx
        .binance()
        .klines(SYMBOL, "1h", Some(start.timestamp_millis()), Some(end.timestamp_millis()), 1000)
        .await;

    match hourly {
        Ok(candles) if !candles.is_empty() => {
            info!("Received candle data from Binance: {} rows", candles.len());
            let flows = detected_whales(&candles);
            info!("Detected {} whale events from Binance", flows.len());
            flows
        }
        Ok(_) => {
            warn!("No candles from Binance to detect whales, trying large transactions");
            large_transactions(ctx, price).await
        }
        Err(e) => {
            warn!("Failed to fetch candles from Binance to detect whales ({}), trying large transactions", e);
            large_transactions(ctx, price).await
        }
    }
}

fn detected_whales(candles: &[Candle]) -> Vec<TopFlow> {
    let detector = WhaleDetector::new(DetectorConfig::default().with_drift(true));
    let mut events: Vec<(i64, TopFlow)> = detector
        .detect_and_log(candles)
        .into_iter()
        .filter(|bar| bar.is_whale)
        .map(|bar| {
            let usd = bar.usd_volume();
            let time = from_unix_ms(bar.open_time)
                .map(|at| at.format(DATETIME_FORMAT).to_string())
                .unwrap_or_default();
            let flow = TopFlow {
                hash: "N/A".to_string(),
                time,
                input_total_usd: usd,
                output_total_usd: usd,
                fee_usd: 0.0,
                is_confirmed: true,
            };
            (bar.open_time, flow)
        })
        .collect();

    events.sort_by(|a, b| b.0.cmp(&a.0));
    events.into_iter().take(TOP_FLOWS).map(|(_, flow)| flow).collect()
}

async fn large_transactions(ctx: &ReportContext, price: f64) -> Vec<TopFlow> {
    let blockchair = ctx.blockchair();

    match blockchair.large_transactions_v3().await {
        Ok(flows) if !flows.is_empty() => {
            info!("Fetched {} large transactions from Blockchair API v3", flows.len());
            return flows;
        }
        result => warn!("No large transactions from Blockchair API v3 ({}), trying v2", describe(&result)),
    }

    match blockchair.large_transactions_v2().await {
        Ok(flows) if !flows.is_empty() => {
            info!("Fetched {} large transactions from Blockchair API v2", flows.len());
            return flows;
        }
        result => warn!("No large transactions from Blockchair API v2 ({}), trying Mempool.space", describe(&result)),
    }

    match ctx.mempool().recent_transactions().await {
        Ok(txs) => {
            let flows = mempool_flows(&txs, price, ctx.now.timestamp());
            if flows.is_empty() {
                warn!("No large transactions found on Mempool.space, proceeding with empty top_flows");
            } else {
                info!("Fetched {} large transactions from Mempool.space", flows.len());
            }
            flows
        }
        Err(e) => {
            warn!("Failed to fetch transactions from Mempool.space: {}", e);
            Vec::new()
        }
    }
}

fn describe(result: &std::result::Result<Vec<TopFlow>, FetchError>) -> String {
    match result {
        Ok(_) => "empty".to_string(),
        Err(e) => e.to_string(),
    }
}

/// Of the first few recent transactions, those moving at least $1M, largest first.
fn mempool_flows(txs: &[MempoolTx], price: f64, now_secs: i64) -> Vec<TopFlow> {
    let usd = |btc: f64| if price > 0.0 { btc * price } else { 0.0 };

    let mut flows: Vec<TopFlow> = txs
        .iter()
        .take(TOP_FLOWS)
        .filter(|tx| usd(tx.input_btc()) >= LARGE_TX_USD as f64)
        .map(|tx| TopFlow {
            hash: tx.txid.clone(),
            time: from_unix_secs(tx.status.block_time.unwrap_or(now_secs))
                .map(|at| at.format(DATETIME_FORMAT).to_string())
                .unwrap_or_default(),
            input_total_usd: usd(tx.input_btc()),
            output_total_usd: usd(tx.output_btc()),
            fee_usd: usd(tx.fee_btc()),
            is_confirmed: tx.status.confirmed,
        })
        .collect();

    flows.sort_by(|a, b| b.input_total_usd.total_cmp(&a.input_total_usd));
    flows.truncate(TOP_FLOWS);
    flows
}
