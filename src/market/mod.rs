pub mod analysis;
pub mod types;

pub use analysis::{
    generate_market_analysis, market_conclusion, support_from_closes, support_from_lows, FlowTotals,
};
pub use types::{value_f64, AggTrade, Candle, FeeSeries, Markets, PriceHistory, Ticker24h, TopFlow, Yields};
