use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::api::{self, MonteCarloPayload, SimulatePayload};
use crate::core::GoalFundingInput;
use crate::error::Result;
use crate::logging;

#[derive(Parser, Debug)]
#[command(
    name = "runway",
    about = "Household cashflow what-if projector with Monte Carlo risk bands"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = logging::DEFAULT_LEVEL,
        help = "Log level for this crate; RUST_LOG takes precedence"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Project one scenario month by month
    Simulate {
        #[arg(long, help = "Scenario JSON file, or - for stdin")]
        input: PathBuf,
    },
    /// Run a seeded Monte Carlo over a scenario
    MonteCarlo {
        #[arg(long, help = "Monte Carlo request JSON file, or - for stdin")]
        input: PathBuf,
        #[arg(long, help = "Override the trial count (clamped to 10..=2000)")]
        trials: Option<u32>,
        #[arg(long, allow_negative_numbers = true, help = "Override the master seed")]
        seed: Option<i64>,
    },
    /// Step a single savings goal toward its target
    GoalFunding {
        #[arg(long, help = "Goal funding JSON file, or - for stdin")]
        input: PathBuf,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { host, port } => api::run_http_server(host, port).await?,
        Command::Simulate { input } => {
            let payload: SimulatePayload = read_json(&input)?;
            print_json(&api::simulate(payload)?)?;
        }
        Command::MonteCarlo { input, trials, seed } => {
            let mut payload: MonteCarloPayload = read_json(&input)?;
            apply_overrides(&mut payload, trials, seed);
            print_json(&api::monte_carlo(payload)?)?;
        }
        Command::GoalFunding { input } => {
            let payload: GoalFundingInput = read_json(&input)?;
            print_json(&api::goal_funding(payload)?)?;
        }
    }
    Ok(())
}

fn apply_overrides(payload: &mut MonteCarloPayload, trials: Option<u32>, seed: Option<i64>) {
    if let Some(v) = trials {
        payload.request.trials = v;
    }
    if let Some(v) = seed {
        payload.request.seed = Some(v);
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    tracing::debug!("read {} bytes from {}", raw.len(), path.display());
    Ok(serde_json::from_str(&raw)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
