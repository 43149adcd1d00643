use std::{path::PathBuf, process, sync::Arc};

use clap::{Parser, Subcommand};
use edge_service::{errors::ServiceError, init_logging, requests::InvestmentsFile, serve};
use projection::prelude::*;
use rust_decimal::Decimal;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "projection-service")]
#[command(about = "Monte Carlo value projections for investment holdings")]
struct Args {
    /// Worker threads for trial simulation (0 = one per core)
    #[arg(long, default_value = "0", global = true)]
    threads: usize,

    /// Master seed for reproducible runs
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Upper bound on AnalysisLength x SimCount for one run
    #[arg(long, default_value_t = DEFAULT_MAX_PATH_VALUES, global = true)]
    max_path_values: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve projections over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,

        /// JSON file with an `investments` array to preload
        #[arg(long)]
        investments: Option<PathBuf>,
    },
    /// Run a single projection and print it as JSON
    Simulate {
        #[arg(long)]
        base_price: Decimal,

        /// Simulation option as Key=Value, repeatable
        #[arg(long = "opt", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },
}

fn parse_option(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected Key=Value, got {}", raw))
}

fn load_book(path: Option<&PathBuf>) -> std::result::Result<InvestmentBook, ServiceError> {
    let Some(path) = path else {
        return Ok(InvestmentBook::new());
    };
    let raw = std::fs::read_to_string(path)?;
    let file: InvestmentsFile = serde_json::from_str(&raw)?;
    Ok(InvestmentBook::try_from(file.investments)?)
}

fn run(args: Args) -> std::result::Result<(), ServiceError> {
    let config = EngineConfig::new()
        .with_num_threads(args.threads)
        .with_seed(args.seed)
        .with_max_path_values(args.max_path_values);
    let pipeline = MonteCarloPipeline::new(&config)?;

    match args.command {
        Command::Serve { addr, investments } => {
            let book = load_book(investments.as_ref())?;
            info!(investments = book.len(), "investment book loaded");
            let cache = ProjectionCache::new(
                Arc::new(book),
                Arc::new(InMemoryProjectionStore::new()),
                Arc::new(pipeline),
            );
            serve(&addr, Arc::new(cache))?;
        }
        Command::Simulate {
            base_price,
            options,
        } => {
            let options: OptionMap = options.into_iter().collect();
            let result = pipeline.project(base_price, &options)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

fn main() {
    init_logging();
    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        process::exit(1);
    }
}
