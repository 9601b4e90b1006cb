//! Runs reports by name, persists their JSON and shapes failures.

use clap::ValueEnum;
use log::{error, info};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::dates::DateRange;
use crate::error::{Result, WhaleScopeError};
use crate::reports::{
    arkham_report, balances_report, bitcoin_report, blackrock_report, eth_report, lido_report, polar_report,
    ReportContext,
};

const LIDO_REQUIRED_KEYS: [&str; 4] = ["markets", "yields", "analytics", "charts"];

/// Data sets refreshed by `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Bitcoin,
    Blackrock,
    Lido,
    All,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Bitcoin => "bitcoin",
            Mode::Blackrock => "blackrock",
            Mode::Lido => "lido",
            Mode::All => "all",
        }
    }

    fn report(&self) -> Option<Report> {
        match self {
            Mode::Bitcoin => Some(Report::Bitcoin),
            Mode::Blackrock => Some(Report::Blackrock),
            Mode::Lido => Some(Report::Lido),
            Mode::All => None,
        }
    }
}

/// A single runnable report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Bitcoin,
    Eth,
    Blackrock,
    Lido,
    Polar,
    Balances { entity: String },
    Arkham { entity: String },
}

impl Report {
    /// File the result is saved to, if any.
    pub fn output_file(&self) -> Option<&'static str> {
        match self {
            Report::Bitcoin => Some("output.json"),
            Report::Blackrock => Some("blackrock_output.json"),
            Report::Lido => Some("lido_output.json"),
            Report::Balances { .. } => Some("blackrock_balances.json"),
            Report::Eth | Report::Polar | Report::Arkham { .. } => None,
        }
    }

    /// Days covered when no start date is given.
    fn default_days(&self) -> i64 {
        match self {
            Report::Blackrock => 1,
            Report::Balances { .. } => 35,
            _ => 180,
        }
    }
}

/// Optional `YYYY-MM-DD` bounds from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateArgs {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateArgs {
    fn resolve(&self, report: &Report, ctx: &ReportContext) -> Result<DateRange> {
        DateRange::resolve(self.start.as_deref(), self.end.as_deref(), report.default_days(), ctx.now)
    }
}

/// Clear the cache, run `report`, and save its JSON to the report's output file.
pub async fn run_report(ctx: &ReportContext, report: &Report, dates: &DateArgs) -> Result<Value> {
    info!("Starting report {:?}", report);
    ctx.clear_cache();

    let value = match report {
        Report::Bitcoin => {
            let range = dates.resolve(report, ctx)?;
            let mut db = ctx.open_db()?;
            to_value(bitcoin_report(ctx, &mut db, &range).await?)?
        }
        Report::Eth => {
            let range = dates.resolve(report, ctx)?;
            to_value(eth_report(ctx, &range).await?)?
        }
        Report::Blackrock => {
            let range = dates.resolve(report, ctx)?;
            let mut db = ctx.open_db()?;
            to_value(blackrock_report(ctx, &mut db, &range).await?)?
        }
        Report::Lido => {
            let mut db = ctx.open_db()?;
            let value = to_value(lido_report(ctx, &mut db).await?)?;
            validate_lido(&value)?;
            value
        }
        Report::Polar => to_value(polar_report(ctx).await?)?,
        Report::Balances { entity } => {
            let range = dates.resolve(report, ctx)?;
            let db = ctx.open_db()?;
            to_value(balances_report(&db, entity, &range)?)?
        }
        Report::Arkham { entity } => {
            let mut db = ctx.open_db()?;
            to_value(arkham_report(ctx, &mut db, entity).await?)?
        }
    };

    if let Some(file) = report.output_file() {
        ctx.write_json(file, &value)?;
    }
    Ok(value)
}

/// Refresh one data set, or all of them keyed by mode name. A failing mode
/// yields `{"error": ...}` in place of its result.
pub async fn update(ctx: &ReportContext, mode: Mode, dates: &DateArgs) -> Value {
    info!("Starting data update for mode '{}'", mode.name());
    match mode.report() {
        Some(report) => update_one(ctx, &report, dates).await,
        None => {
            let mut results = Map::new();
            for mode in [Mode::Bitcoin, Mode::Blackrock, Mode::Lido] {
                if let Some(report) = mode.report() {
                    results.insert(mode.name().to_string(), update_one(ctx, &report, dates).await);
                }
            }
            Value::Object(results)
        }
    }
}

async fn update_one(ctx: &ReportContext, report: &Report, dates: &DateArgs) -> Value {
    match run_report(ctx, report, dates).await {
        Ok(value) => value,
        Err(e) => {
            error!("Report {:?} failed: {}", report, e);
            error_value(&e)
        }
    }
}

pub fn error_value(error: &WhaleScopeError) -> Value {
    json!({ "error": error.to_string() })
}

fn to_value<T: Serialize>(report: T) -> Result<Value> {
    Ok(serde_json::to_value(report)?)
}

fn validate_lido(value: &Value) -> Result<()> {
    let missing: Vec<&str> = LIDO_REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| value.get(*key).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(WhaleScopeError::Report(format!(
            "Invalid JSON structure from lido: missing {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::ApiKeys;
    use crate::reports::testing;
    use tempfile::tempdir;

    #[test]
    fn test_lido_validation() {
        assert!(validate_lido(&json!({"markets": {}, "yields": {}, "analytics": {}, "charts": []})).is_ok());
        let err = validate_lido(&json!({"markets": {}, "yields": {}})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON structure from lido: missing analytics, charts");
    }

    #[test]
    fn test_default_windows() {
        assert_eq!(Report::Bitcoin.default_days(), 180);
        assert_eq!(Report::Blackrock.default_days(), 1);
        assert_eq!(Report::Balances { entity: "blackrock".into() }.default_days(), 35);
    }

    #[tokio::test]
    async fn test_bad_dates_become_error_value() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |_| None);
        let dates = DateArgs {
            start: Some("2025-06-05".into()),
            end: Some("2025-06-01".into()),
        };

        let value = update(&ctx, Mode::Bitcoin, &dates).await;

        assert_eq!(value["error"], "Invalid date range: 2025-06-05 is after 2025-06-01");
        assert!(!dir.path().join("output.json").exists());
    }

    #[tokio::test]
    async fn test_update_all_writes_each_output() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |_| None);

        let value = update(&ctx, Mode::All, &DateArgs::default()).await;

        let modes: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(modes, vec!["bitcoin", "blackrock", "lido"]);
        assert_eq!(value["bitcoin"]["type"], "result");
        assert_eq!(value["lido"]["yields"]["avg_rewards"], 3.5);
        for file in ["output.json", "blackrock_output.json", "lido_output.json"] {
            let saved: Value = serde_json::from_str(&std::fs::read_to_string(dir.path().join(file)).unwrap()).unwrap();
            assert!(saved.is_object(), "{} is not an object", file);
        }
    }

    #[tokio::test]
    async fn test_arkham_has_no_output_file() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(dir.path(), ApiKeys::default(), |_| None);
        let report = Report::Arkham {
            entity: "blackrock".into(),
        };

        assert!(run_report(&ctx, &report, &DateArgs::default()).await.is_err());
        assert!(report.output_file().is_none());
    }
}
