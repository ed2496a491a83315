use std::fmt;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;
use crate::core::{
    BasePolicy, CoinData, Milestone, Prediction, PredictionStore, TrajectoryRow,
    TrajectorySummary, base_milestone, build_trajectory, summarize, trajectory_rows,
};
use crate::error::CliError;
use crate::format::{format_large_number, parse_money_input};
use crate::persistence::JsonFileRepository;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliBasePolicy {
    Recompute,
    ConfirmReset,
}

impl From<CliBasePolicy> for BasePolicy {
    fn from(value: CliBasePolicy) -> Self {
        match value {
            CliBasePolicy::Recompute => BasePolicy::Recompute,
            CliBasePolicy::ConfirmReset => BasePolicy::ConfirmReset,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "take-profit",
    about = "Staged profit-taking planner for a crypto holding across market-cap milestones"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "TAKE_PROFIT_DATA_DIR",
        default_value = ".take-profit",
        help = "Directory holding predictions.json"
    )]
    pub data_dir: PathBuf,
    #[arg(
        long,
        global = true,
        value_enum,
        env = "TAKE_PROFIT_BASE_POLICY",
        default_value_t = CliBasePolicy::Recompute,
        help = "What happens to custom milestones when the base position changes"
    )]
    pub base_policy: CliBasePolicy,
    #[arg(
        long,
        global = true,
        env = "TAKE_PROFIT_LOG",
        default_value = "info",
        help = "Log level used when RUST_LOG is unset"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "TAKE_PROFIT_PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Print every stored prediction with its trajectory.
    Show,
    /// Project a one-off trajectory without touching stored predictions.
    Project {
        #[arg(long, value_parser = parse_amount)]
        holdings: f64,
        #[arg(long, value_parser = parse_amount)]
        market_cap: f64,
        #[arg(
            long = "target",
            value_parser = parse_target,
            help = "Milestone as MARKET_CAP:PROFIT_PERCENT, e.g. 2000000:50; repeatable"
        )]
        targets: Vec<(f64, f64)>,
    },
    /// Print the stored collection as JSON.
    Export,
    /// Replace the stored collection with a JSON export.
    Import { file: PathBuf },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionOutput {
    coin_data: CoinData,
    rows: Vec<TrajectoryRow>,
    summary: TrajectorySummary,
}

pub async fn run(command: Command, config: &AppConfig) -> Result<(), CliError> {
    match command {
        Command::Serve { port } => {
            crate::api::run_http_server(port, config).await?;
        }
        Command::Show => {
            let store = open_store(config);
            for prediction in store.predictions() {
                print!("{}", PredictionReport(prediction));
            }
        }
        Command::Project {
            holdings,
            market_cap,
            targets,
        } => {
            let output = project(holdings, market_cap, &targets)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Export => {
            let store = open_store(config);
            println!("{}", store.export_all());
        }
        Command::Import { file } => {
            let text = fs::read_to_string(&file)?;
            let mut store = open_store(config);
            store.import_all(&text)?;
            info!(
                file = %file.display(),
                predictions = store.predictions().len(),
                "predictions imported"
            );
        }
    }
    Ok(())
}

fn open_store(config: &AppConfig) -> PredictionStore<JsonFileRepository> {
    PredictionStore::open(JsonFileRepository::new(&config.data_dir), config.base_policy)
}

fn project(
    holdings: f64,
    market_cap: f64,
    targets: &[(f64, f64)],
) -> Result<ProjectionOutput, CliError> {
    for (name, value) in [("--holdings", holdings), ("--market-cap", market_cap)] {
        if !value.is_finite() || value < 0.0 {
            return Err(CliError::InvalidArgs(format!("{name} must be >= 0")));
        }
    }
    if let Some((cap, _)) = targets.iter().find(|(cap, _)| *cap < market_cap) {
        return Err(CliError::InvalidArgs(format!(
            "--target market cap {cap} is below --market-cap"
        )));
    }

    let coin_data = CoinData {
        holdings,
        market_cap,
    };
    let mut milestones = vec![base_milestone(coin_data)];
    milestones.extend(
        targets
            .iter()
            .map(|&(cap, percent)| Milestone::target(cap, percent)),
    );
    let trajectory = build_trajectory(coin_data, &milestones);

    Ok(ProjectionOutput {
        coin_data,
        rows: trajectory_rows(&trajectory),
        summary: summarize(&trajectory),
    })
}

fn parse_target(raw: &str) -> Result<(f64, f64), String> {
    let (cap, percent) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MARKET_CAP:PROFIT_PERCENT, got {raw}"))?;
    let cap = parse_amount(cap)?;
    let percent: f64 = percent
        .trim()
        .trim_end_matches('%')
        .parse()
        .map_err(|e| format!("invalid profit percent {percent}: {e}"))?;

    if cap < 0.0 {
        return Err("market cap must be >= 0".to_string());
    }
    if !(0.0..=100.0).contains(&percent) {
        return Err("profit percent must be between 0 and 100".to_string());
    }
    Ok((cap, percent))
}

fn parse_amount(raw: &str) -> Result<f64, String> {
    parse_money_input(raw).ok_or_else(|| format!("invalid amount {raw}"))
}

/// Plain-text listing of one prediction's trajectory, as printed by `show`.
struct PredictionReport<'a>(&'a Prediction);

impl fmt::Display for PredictionReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prediction = self.0;
        let trajectory = prediction.milestones();
        writeln!(f, "{} ({})", prediction.name(), prediction.id())?;

        for row in trajectory_rows(trajectory) {
            let multiplier = if row.index == 0 {
                String::new()
            } else {
                format!(" ({:.2}x)", row.multiplier)
            };
            writeln!(
                f,
                "  at {}{multiplier}: holdings {}, take {}% = {}, new holdings {}, cumulative {}",
                format_large_number(row.market_cap, 1, true),
                format_large_number(row.holdings, 2, true),
                row.profit_percent,
                format_large_number(row.profit, 2, true),
                format_large_number(row.new_holdings, 2, true),
                format_large_number(row.cumulative_profit, 2, true),
            )?;
        }

        let summary = summarize(trajectory);
        writeln!(
            f,
            "  total realized {}, final holdings {}",
            format_large_number(summary.total_profit, 2, true),
            format_large_number(summary.final_holdings, 2, true),
        )
    }
}
