use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use log::{error, info};
use serde_json::Value;

use whalescope::dispatch::{self, DateArgs, Mode, Report};
use whalescope::reports::ReportContext;
use whalescope::{logging, AppConfig, Result};

/// Fetch market, ETF and staking data and print it as JSON
#[derive(Parser, Debug)]
#[clap(name = "whalescope", version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct DateFlags {
    /// Start date (YYYY-MM-DD)
    #[clap(long)]
    start_date: Option<String>,

    /// End date (YYYY-MM-DD)
    #[clap(long)]
    end_date: Option<String>,
}

impl From<DateFlags> for DateArgs {
    fn from(flags: DateFlags) -> Self {
        Self {
            start: flags.start_date,
            end: flags.end_date,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh one data set (or all) and save it to its output file
    Update {
        #[clap(value_enum)]
        mode: Mode,
        #[clap(flatten)]
        dates: DateFlags,
    },
    /// Bitcoin market snapshot
    Bitcoin {
        #[clap(flatten)]
        dates: DateFlags,
    },
    /// Ethereum market snapshot from Binance
    Eth {
        #[clap(flatten)]
        dates: DateFlags,
    },
    /// IBIT/ETHA market data and tracked BlackRock wallets
    Blackrock {
        #[clap(flatten)]
        dates: DateFlags,
    },
    /// Lido staking pool, validator queues and staking ratio
    Lido,
    /// Volume/volatility shares of ten USDT pairs
    Polar,
    /// Stored Arkham balance history of an entity
    Balances {
        #[clap(long, default_value = "blackrock")]
        entity: String,
        #[clap(flatten)]
        dates: DateFlags,
    },
    /// Snapshot an entity's balances from Arkham
    Arkham {
        #[clap(long, default_value = "blackrock")]
        entity: String,
    },
}

impl Command {
    /// Log file stem.
    fn log_name(&self) -> &'static str {
        match self {
            Command::Update { .. } => "whalescope",
            Command::Bitcoin { .. } => "bitcoin",
            Command::Eth { .. } => "eth",
            Command::Blackrock { .. } => "blackrock",
            Command::Lido => "lido_staking",
            Command::Polar => "binance_polar",
            Command::Balances { .. } => "fetch_balance_data",
            Command::Arkham { .. } => "arkham",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Script failed: {}", e);
            println!("{}", dispatch::error_value(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value> {
    let config = AppConfig::load_from_env()?;
    logging::init(cli.command.log_name(), &config.log_dir);
    info!("Arguments received: {:?}", cli.command);
    let ctx = ReportContext::from_config(config)?;

    let (report, dates) = match cli.command {
        Command::Update { mode, dates } => return Ok(dispatch::update(&ctx, mode, &dates.into()).await),
        Command::Bitcoin { dates } => (Report::Bitcoin, dates),
        Command::Eth { dates } => (Report::Eth, dates),
        Command::Blackrock { dates } => (Report::Blackrock, dates),
        Command::Lido => (Report::Lido, DateFlags::default()),
        Command::Polar => (Report::Polar, DateFlags::default()),
        Command::Balances { entity, dates } => (Report::Balances { entity }, dates),
        Command::Arkham { entity } => (Report::Arkham { entity }, DateFlags::default()),
    };
    dispatch::run_report(&ctx, &report, &dates.into()).await
}
