use log::{info, warn};

use super::coin::{CoinParts, CoinReport, Spot};
use super::{or_default, ReportContext};
use crate::dates::{from_unix_ms, isoformat, DateRange};
use crate::error::Result;
use crate::market::{support_from_lows, AggTrade, FeeSeries, FlowTotals, Markets, PriceHistory, TopFlow, Yields};

const SYMBOL: &str = "ETHUSDT";
/// Flat fee estimate: 0.01 % of traded value.
const FEE_RATE: f64 = 0.0001;
const TOP_FLOWS: usize = 5;

/// Ethereum snapshot from Binance alone. Market cap and 7d/30d changes are
/// not available there and stay at 0.
pub async fn eth_report(ctx: &ReportContext, range: &DateRange) -> Result<CoinReport> {
    info!("Fetching data from {} to {}", range.start_str(), range.end_str());
    let binance = ctx.binance();

    let candles = or_default(
        binance.klines(SYMBOL, "1d", Some(range.start_ms()), Some(range.end_ms()), 1000).await,
        "historical data from Binance",
        Vec::new(),
    );
    let price_history = PriceHistory::from_candles(&candles);

    let spot = or_default(binance.ticker_24h(SYMBOL).await.map(Spot::from), "ticker data from Binance", Spot::default());
    let markets = Markets {
        price: spot.price,
        volume_24h: spot.volume_24h,
        percent_change_24h: spot.percent_change_24h,
        last_updated: ctx.iso_timestamp(),
        ..Markets::default()
    };
    let yields = Yields {
        percent_change_24h: spot.percent_change_24h,
        ..Yields::default()
    };

    let trades = match binance.agg_trades(SYMBOL, 1000).await {
        Ok(trades) => trades,
        Err(e) => {
            warn!("Failed to fetch aggTrades from Binance, keeping flows at 0: {}", e);
            Vec::new()
        }
    };
    let flows = if trades.is_empty() {
        FlowTotals::default()
    } else {
        FlowTotals::from_agg_trades(&trades, spot.price)
    };
    let top_flows = largest_trades(&trades);
    info!("Detected {} top flows from aggTrades", top_flows.len());

    let fees = FeeSeries {
        dates: price_history.dates.clone(),
        values: vec![spot.volume_24h * FEE_RATE; price_history.dates.len()],
    };

    info!("fetch_eth_data completed");
    Ok(CoinReport::assemble(CoinParts {
        markets,
        yields,
        flows,
        top_flows,
        fees,
        price_history,
        support: support_from_lows(&candles),
        unit: "ETH",
        timestamp: ctx.iso_timestamp(),
    }))
}

/// The five trades with the largest notional, buys as input and sells as output.
fn largest_trades(trades: &[AggTrade]) -> Vec<TopFlow> {
    let mut sorted: Vec<&AggTrade> = trades.iter().collect();
    sorted.sort_by(|a, b| b.notional().total_cmp(&a.notional()));

    sorted
        .into_iter()
        .take(TOP_FLOWS)
        .map(|trade| {
            let notional = trade.notional();
            TopFlow {
                hash: "N/A".to_string(),
                time: from_unix_ms(trade.time)
                    .map(|at| isoformat(&at))
                    .unwrap_or_default(),
                input_total_usd: if trade.buyer_is_maker { 0.0 } else { notional },
                output_total_usd: if trade.buyer_is_maker { notional } else { 0.0 },
                fee_usd: notional * FEE_RATE,
                is_confirmed: true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::ApiKeys;
    use crate::reports::testing;
    use serde_json::json;
    use tempfile::tempdir;

    fn trade(price: f64, qty: f64, time: i64, maker: bool) -> AggTrade {
        AggTrade {
            price,
            quantity: qty,
            time,
            buyer_is_maker: maker,
        }
    }

    #[test]
    fn test_largest_trades_by_notional() {
        let trades: Vec<AggTrade> = (1..=7)
            .map(|i| trade(2500.0, i as f64, 1_749_124_800_000 + i, i % 2 == 0))
            .collect();

        let flows = largest_trades(&trades);
        assert_eq!(flows.len(), 5);
        // qty 7 is a buy, qty 6 a sell
        assert_eq!(flows[0].input_total_usd, 17_500.0);
        assert_eq!(flows[0].output_total_usd, 0.0);
        assert_eq!(flows[1].input_total_usd, 0.0);
        assert_eq!(flows[1].output_total_usd, 15_000.0);
        assert_eq!(flows[0].fee_usd, 1.75);
        assert_eq!(flows[0].time, "2025-06-05T12:00:00.007000");
    }

    #[tokio::test]
    async fn test_eth_report() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |req| match req.url.as_str() {
            u if u.ends_with("/api/v3/klines") => Some(json!([
                [1748908800000i64, "2600", "2650", "2550", "2620", "1000", 0, "0", 0, "0", "0", "0"],
                [1748995200000i64, "2620", "2700", "2580", "2680", "1100", 0, "0", 0, "0", "0", "0"]
            ])),
            u if u.ends_with("/api/v3/ticker/24hr") => {
                Some(json!({"lastPrice": "2500", "volume": "400", "priceChangePercent": "2.5"}))
            }
            u if u.ends_with("/api/v3/aggTrades") => Some(json!([
                {"p": "2500", "q": "4", "T": 1749124800000i64, "m": false},
                {"p": "2500", "q": "1", "T": 1749124800001i64, "m": true}
            ])),
            _ => None,
        });
        let range = DateRange::resolve(Some("2025-06-03"), Some("2025-06-05"), 180, testing::now()).unwrap();

        let report = eth_report(&ctx, &range).await.unwrap();

        assert_eq!(report.markets.market_cap, 0.0);
        assert_eq!(report.markets.volume_24h, 1_000_000.0);
        assert_eq!(report.yields.percent_change_7d, 0.0);
        assert_eq!(report.fees.values, vec![100.0, 100.0]);
        assert_eq!(report.flows.net_flow, 3.0);
        assert_eq!(report.top_flows[0].input_total_usd, 10_000.0);
        // support is the lowest low, 2550; price 2500 sits below it
        assert!(report.analysis.contains("Price near support ($2550.0)"));
        assert!(report.conclusion.starts_with("Mixed market signals"));

        let value = serde_json::to_value(&report).unwrap();
        assert!(value["markets"].get("fdv").is_none());
        assert_eq!(value["markets"]["last_updated"], "2025-06-05T12:00:00");
    }
}
