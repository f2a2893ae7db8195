use std::env;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use colored::Colorize;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

use stake_projector::{
    HttpRewardOracle, ProjectorConfig, ProjectorError, Result, SimulationOutcome,
    SimulationRequest, SimulationResult, StakeRewardProjector,
};

const LOG_LEVEL_ENV: &str = "STAKE_PROJECTOR_LOG";
const USAGE: &str = "Usage: stake_projector <config.json> <amount> <start YYYY-MM-DD> <end YYYY-MM-DD> [--json]";

struct CliArgs {
    config_path: String,
    stake_amount: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    if positional.len() != 4 {
        return Err(ProjectorError::Config(USAGE.to_string()));
    }

    let stake_amount = positional[1]
        .parse::<f64>()
        .map_err(|_| ProjectorError::Config(format!("Invalid stake amount: {}", positional[1])))?;
    let parse_date = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| ProjectorError::Config(format!("Invalid date {}: {}", raw, e)))
    };

    Ok(CliArgs {
        config_path: positional[0].clone(),
        stake_amount,
        start_date: parse_date(positional[2])?,
        end_date: parse_date(positional[3])?,
        json,
    })
}

fn init_logging() -> Result<()> {
    let level = env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|raw| LevelFilter::from_str(&raw).ok())
        .unwrap_or(LevelFilter::Info);

    SimpleLogger::new()
        .with_level(level)
        .init()
        .map_err(|e| ProjectorError::Config(format!("Failed to initialize logger: {}", e)))
}

// Function to display the projected ledger
fn display_result(request: &SimulationRequest, result: &SimulationResult) {
    println!("\n________________________Stake Reward Projection_____________________________");
    println!("Stake Amount    : {:.8}", request.stake_amount);
    println!("Window          : {} to {} ({} days)", request.start_date, request.end_date, request.requested_days());
    println!("____________________________________________________________________________");
    println!(
        "{:>6} {:>12} {:>10} {:>16} {:>12} {:>14} {:>8}",
        "Day", "Block", "Date", "Balance", "Price", "Reward", "Tickets"
    );

    for step in &result.ledger {
        let date = request.start_date + Duration::days(step.simulated_day.floor() as i64);
        println!(
            "{:>6.0} {:>12} {:>10} {:>16.8} {:>12.4} {:>14.8} {:>8}",
            step.simulated_day,
            step.simulated_block,
            date,
            step.balance,
            step.ticket_price,
            step.reward,
            step.tickets_purchased
        );
    }

    let roi = format!("{:.4}%", result.roi_percent);
    let roi = if result.roi_percent >= 0.0 { roi.green() } else { roi.red() };
    println!("____________________________________________________________________________");
    println!("Return          : {} ({:.8} coins)", roi, result.roi_amount);
    println!("Total Reward    : {:.8}", result.total_reward());
    println!("Final Balance   : {:.8}", result.final_balance().unwrap_or(request.stake_amount));
    println!("____________________________________________________________________________\n");
}

/// Run one projection from the command line
async fn run_projection() -> Result<()> {
    init_logging()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let mut config = ProjectorConfig::load(&cli.config_path)?;
    config.apply_env_overrides();

    let oracle = HttpRewardOracle::new(config.oracle.clone())?;
    let projector = StakeRewardProjector::new(
        config.network,
        config.emission,
        oracle,
        Duration::seconds(config.oracle.cache_ttl_secs),
    )?;

    let request = SimulationRequest::new(cli.stake_amount, cli.start_date, cli.end_date);
    info!(
        "Projecting {} coins from {} to {}",
        request.stake_amount, request.start_date, request.end_date
    );

    match projector.simulate(&request).await? {
        SimulationOutcome::Completed(result) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                display_result(&request, &result);
            }
        }
        SimulationOutcome::Superseded { request_id, latest_id } => {
            info!("Run {} was superseded by run {}", request_id, latest_id);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Run the projection and handle any errors
    if let Err(e) = run_projection().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
