use serde::Serialize;

use crate::market::{
    generate_market_analysis, market_conclusion, FeeSeries, FlowTotals, Markets, PriceHistory, Ticker24h, TopFlow,
    Yields,
};

/// Market snapshot shared by the Bitcoin and Ethereum reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinReport {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub markets: Markets,
    pub yields: Yields,
    #[serde(flatten)]
    pub flows: FlowTotals,
    pub top_flows: Vec<TopFlow>,
    pub fees: FeeSeries,
    pub price_history: PriceHistory,
    pub analysis: String,
    pub conclusion: String,
    pub timestamp: String,
}

/// Spot values from a 24h ticker; volume is converted to quote currency.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Spot {
    pub price: f64,
    pub volume_24h: f64,
    pub percent_change_24h: f64,
}

impl From<Ticker24h> for Spot {
    fn from(ticker: Ticker24h) -> Self {
        Self {
            price: ticker.last_price,
            volume_24h: ticker.volume * ticker.last_price,
            percent_change_24h: ticker.price_change_percent,
        }
    }
}

pub(crate) struct CoinParts {
    pub markets: Markets,
    pub yields: Yields,
    pub flows: FlowTotals,
    pub top_flows: Vec<TopFlow>,
    pub fees: FeeSeries,
    pub price_history: PriceHistory,
    pub support: f64,
    pub unit: &'static str,
    pub timestamp: String,
}

impl CoinReport {
    /// Attach analysis and conclusion. The largest-listed flow stands in for
    /// the latest whale transaction.
    pub(crate) fn assemble(parts: CoinParts) -> Self {
        let whale_usd = parts.top_flows.first().map_or(0.0, |flow| flow.input_total_usd);
        let change_24h = parts.markets.percent_change_24h;
        let analysis = generate_market_analysis(
            parts.markets.price,
            change_24h,
            parts.flows.net_flow,
            whale_usd,
            parts.support,
            parts.unit,
        );

        Self {
            kind: "result",
            analysis,
            conclusion: market_conclusion(change_24h, parts.flows.net_flow).to_string(),
            markets: parts.markets,
            yields: parts.yields,
            flows: parts.flows,
            top_flows: parts.top_flows,
            fees: parts.fees,
            price_history: parts.price_history,
            timestamp: parts.timestamp,
        }
    }
}
