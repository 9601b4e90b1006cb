use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dates::{from_unix_ms, DATE_FORMAT};

/// Numbers that upstream APIs send either as JSON numbers or as strings.
pub fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_f64(&value).ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {}", value)))
}

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Parse a Binance kline array `[open_time, open, high, low, close, volume, ...]`.
    pub fn from_kline(row: &Value) -> Option<Self> {
        let fields = row.as_array()?;
        Some(Self {
            open_time: fields.first()?.as_i64()?,
            open: value_f64(fields.get(1)?)?,
            high: value_f64(fields.get(2)?)?,
            low: value_f64(fields.get(3)?)?,
            close: value_f64(fields.get(4)?)?,
            volume: value_f64(fields.get(5)?)?,
        })
    }

    pub fn date(&self) -> String {
        from_unix_ms(self.open_time)
            .map(|at| at.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ticker24h {
    #[serde(rename = "lastPrice", deserialize_with = "de_f64", default)]
    pub last_price: f64,
    #[serde(deserialize_with = "de_f64", default)]
    pub volume: f64,
    #[serde(rename = "priceChangePercent", deserialize_with = "de_f64", default)]
    pub price_change_percent: f64,
}

/// Binance aggregated trade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggTrade {
    #[serde(rename = "p", deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "de_f64")]
    pub quantity: f64,
    #[serde(rename = "T")]
    pub time: i64,
    /// Buyer was the maker, i.e. the aggressor sold.
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

impl AggTrade {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceHistory {
    pub dates: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
}

impl PriceHistory {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut history = Self::default();
        for candle in candles {
            history.dates.push(candle.date());
            history.open.push(candle.open);
            history.high.push(candle.high);
            history.low.push(candle.low);
            history.close.push(candle.close);
        }
        history
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeSeries {
    pub dates: Vec<String>,
    pub values: Vec<f64>,
}

/// A large flow as shown in the "top flows" table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFlow {
    pub hash: String,
    pub time: String,
    pub input_total_usd: f64,
    pub output_total_usd: f64,
    pub fee_usd: f64,
    pub is_confirmed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Markets {
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fdv: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_supply: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_supply: Option<f64>,
    pub percent_change_24h: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change_7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change_30d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_dominance: Option<f64>,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Yields {
    pub percent_change_24h: f64,
    pub percent_change_7d: f64,
    pub percent_change_30d: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candle_from_kline() {
        let row = json!([1746057600000i64, "94172.00", "97437.56", "94130.00", "96489.91", "21380.02", 1746143999999i64, "0", 0, "0", "0", "0"]);
        let candle = Candle::from_kline(&row).unwrap();
        assert_eq!(candle.open, 94172.0);
        assert_eq!(candle.close, 96489.91);
        assert_eq!(candle.date(), "2025-05-01");
    }

    #[test]
    fn test_short_kline_is_rejected() {
        assert!(Candle::from_kline(&json!([1746057600000i64, "1.0"])).is_none());
        assert!(Candle::from_kline(&json!({"open": 1})).is_none());
    }

    #[test]
    fn test_agg_trade_parses_string_numbers() {
        let trade: AggTrade = serde_json::from_value(json!({
            "a": 1, "p": "100000.5", "q": "0.2", "f": 1, "l": 1, "T": 1746057600000i64, "m": true, "M": true
        }))
        .unwrap();
        assert_eq!(trade.notional(), 20000.1);
        assert!(trade.buyer_is_maker);
    }

    #[test]
    fn test_markets_omit_unknown_fields() {
        let markets = Markets {
            price: 2500.0,
            last_updated: "now".into(),
            ..Markets::default()
        };
        let value = serde_json::to_value(&markets).unwrap();
        assert!(value.get("fdv").is_none());
        assert_eq!(value["market_cap"], json!(0.0));
    }
}
