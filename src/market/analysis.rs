use serde::Serialize;

use super::types::{AggTrade, Candle};

/// Single-trade USD value above which whale activity is called out.
pub const HIGH_WHALE_ACTIVITY_USD: f64 = 200_000_000.0;
/// Price within this factor of support counts as "near support".
pub const SUPPORT_PROXIMITY: f64 = 1.02;

/// Taker-side flows over a batch of aggregated trades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowTotals {
    pub inflows: f64,
    pub outflows: f64,
    pub net_flow: f64,
}

impl FlowTotals {
    /// Buyer-maker trades count as outflows. Totals are USD, converted to
    /// coin units when `price` is positive.
    pub fn from_agg_trades(trades: &[AggTrade], price: f64) -> Self {
        let (mut inflows, mut outflows) = trades.iter().fold((0.0, 0.0), |(inflows, outflows), trade| {
            if trade.buyer_is_maker {
                (inflows, outflows + trade.notional())
            } else {
                (inflows + trade.notional(), outflows)
            }
        });
        log::info!("Inflows calculated: {} USD, Outflows calculated: {} USD", inflows, outflows);

        if price > 0.0 {
            inflows /= price;
            outflows /= price;
        } else {
            log::warn!("Price is 0, cannot convert inflows/outflows to coin units");
        }

        Self {
            inflows,
            outflows,
            net_flow: inflows - outflows,
        }
    }
}

/// Lowest positive close, or 0 without data.
pub fn support_from_closes(candles: &[Candle]) -> f64 {
    min_positive(candles.iter().map(|c| c.close))
}

/// Lowest low, or 0 without data.
pub fn support_from_lows(candles: &[Candle]) -> f64 {
    candles
        .iter()
        .map(|c| c.low)
        .fold(None, |acc: Option<f64>, low| Some(acc.map_or(low, |m| m.min(low))))
        .unwrap_or(0.0)
}

fn min_positive(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|v| *v > 0.0)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
        .unwrap_or(0.0)
}

pub fn generate_market_analysis(
    price: f64,
    change_24h: f64,
    net_flow: f64,
    whale_usd: f64,
    support: f64,
    unit: &str,
) -> String {
    // `{:?}` keeps the trailing `.0` on whole numbers: "2.0%", "$100.0"
    let mut analysis = if change_24h < 0.0 {
        format!("Price declining ({:?}% in 24h)", change_24h)
    } else {
        format!("Price rising ({:?}% in 24h)", change_24h)
    };

    if net_flow < 0.0 {
        analysis.push_str(&format!(
            ", but negative net flow ({:.2} {}) suggests accumulation.",
            net_flow, unit
        ));
    } else {
        analysis.push_str(&format!(
            ", and positive net flow ({:.2} {}) indicates potential selling.",
            net_flow, unit
        ));
    }

    if whale_usd > HIGH_WHALE_ACTIVITY_USD {
        analysis.push_str(&format!(
            " High whale activity (${:.1}M): expect volatility.",
            whale_usd / 1_000_000.0
        ));
    }

    if price <= support * SUPPORT_PROXIMITY {
        analysis.push_str(&format!(
            " Price near support (${:?}): potential buying opportunity.",
            support
        ));
    }

    analysis
}

pub fn market_conclusion(change_24h: f64, net_flow: f64) -> &'static str {
    if change_24h < 0.0 && net_flow < 0.0 {
        "Despite the short-term decline, whale accumulation suggests a potential rebound."
    } else if change_24h > 0.0 && net_flow < 0.0 {
        "Bullish trend supported by whale accumulation; market appears strong."
    } else {
        "Mixed market signals; monitor whale activity and flows for trend confirmation."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(price: f64, quantity: f64, buyer_is_maker: bool) -> AggTrade {
        AggTrade {
            price,
            quantity,
            time: 0,
            buyer_is_maker,
        }
    }

    fn candle(low: f64, close: f64) -> Candle {
        Candle {
            open_time: 0,
            open: close,
            high: close,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_flows_in_coin_units() {
        let trades = vec![trade(100.0, 2.0, false), trade(100.0, 1.0, true), trade(100.0, 0.5, false)];
        let flows = FlowTotals::from_agg_trades(&trades, 100.0);
        assert_eq!(flows.inflows, 2.5);
        assert_eq!(flows.outflows, 1.0);
        assert_eq!(flows.net_flow, 1.5);
    }

    #[test]
    fn test_flows_stay_in_usd_without_price() {
        let flows = FlowTotals::from_agg_trades(&[trade(10.0, 3.0, true)], 0.0);
        assert_eq!(flows.outflows, 30.0);
        assert_eq!(flows.net_flow, -30.0);
    }

    #[test]
    fn test_support_levels() {
        let candles = vec![candle(90.0, 100.0), candle(80.0, 0.0), candle(95.0, 98.0)];
        assert_eq!(support_from_closes(&candles), 98.0);
        assert_eq!(support_from_lows(&candles), 80.0);
        assert_eq!(support_from_closes(&[]), 0.0);
    }

    #[test]
    fn test_analysis_accumulation_and_whales() {
        let analysis = generate_market_analysis(100_000.0, -2.5, -12.346, 250_000_000.0, 50_000.0, "BTC");
        assert_eq!(
            analysis,
            "Price declining (-2.5% in 24h), but negative net flow (-12.35 BTC) suggests accumulation. \
             High whale activity ($250.0M): expect volatility."
        );
    }

    #[test]
    fn test_analysis_near_support() {
        let analysis = generate_market_analysis(101.0, 1.5, 3.0, 0.0, 100.0, "ETH");
        assert!(analysis.starts_with("Price rising (1.5% in 24h), and positive net flow (3.00 ETH)"));
        assert!(analysis.ends_with(" Price near support ($100.0): potential buying opportunity."));
    }

    #[test]
    fn test_analysis_whole_numbers_keep_decimal_point() {
        let analysis = generate_market_analysis(101.0, 2.0, -1.0, 0.0, 100.0, "BTC");
        assert_eq!(
            analysis,
            "Price rising (2.0% in 24h), but negative net flow (-1.00 BTC) suggests accumulation. \
             Price near support ($100.0): potential buying opportunity."
        );
        assert!(generate_market_analysis(1.0, -3.0, 0.0, 0.0, 0.0, "ETH").starts_with("Price declining (-3.0% in 24h)"));
    }

    #[test]
    fn test_conclusions() {
        assert!(market_conclusion(-1.0, -1.0).starts_with("Despite"));
        assert!(market_conclusion(1.0, -1.0).starts_with("Bullish"));
        assert!(market_conclusion(0.0, -1.0).starts_with("Mixed"));
        assert!(market_conclusion(1.0, 1.0).starts_with("Mixed"));
    }
}
