use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;
use crate::constants::{DEFAULT_CONTAMINATION, DEFAULT_N_ESTIMATORS, DEFAULT_RANDOM_SEED, DEFAULT_WORKERS};

#[derive(Parser)]
#[command(name = "stockpulse")]
#[command(about = "Recompute daily features and anomaly scores for stored tickers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recompute features and anomaly scores for stored tickers
    Backfill {
        /// Ticker to process (repeatable); all stored tickers when omitted
        #[arg(short, long = "ticker")]
        tickers: Vec<String>,

        /// Expected share of anomalous days per ticker
        #[arg(long, default_value_t = DEFAULT_CONTAMINATION)]
        contamination: f64,

        /// Seed for the isolation forest
        #[arg(long, default_value_t = DEFAULT_RANDOM_SEED)]
        seed: u64,

        /// Number of isolation trees
        #[arg(long, default_value_t = DEFAULT_N_ESTIMATORS)]
        estimators: usize,

        /// Tickers processed concurrently
        #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,

        /// Leave stored OHLCV columns as they are
        #[arg(long)]
        no_ohlcv_refresh: bool,

        /// Path to the SQLite database
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Import a JSON or NDJSON export of daily documents
    Import {
        /// Export file to read
        #[arg(short, long)]
        source: PathBuf,

        /// Path to the SQLite database
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
    /// Show per-ticker record and anomaly counts
    Status {
        /// Path to the SQLite database
        #[arg(short, long)]
        database: Option<PathBuf>,
    },
}

pub fn run() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Backfill {
            tickers,
            contamination,
            seed,
            estimators,
            workers,
            no_ohlcv_refresh,
            database,
        } => {
            let args = commands::backfill::BackfillArgs {
                tickers,
                contamination,
                seed,
                estimators,
                workers,
                refresh_ohlcv: !no_ohlcv_refresh,
            };
            commands::backfill::run(args, database);
        }
        Commands::Import { source, database } => {
            commands::import::run(source, database);
        }
        Commands::Status { database } => {
            commands::status::run(database);
        }
    }
}
