use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::BackfillConfig;
use crate::services::{Backfill, BackfillReport, SQLiteDatabaseStore, TickerStatus};
use crate::utils::get_database_path;

/// Backfill options as given on the command line
#[derive(Debug, Clone)]
pub struct BackfillArgs {
    pub tickers: Vec<String>,
    pub contamination: f64,
    pub seed: u64,
    pub estimators: usize,
    pub workers: usize,
    pub refresh_ohlcv: bool,
}

impl BackfillArgs {
    fn into_config(self) -> BackfillConfig {
        let tickers = if self.tickers.is_empty() {
            None
        } else {
            Some(self.tickers)
        };
        BackfillConfig::new(self.contamination, self.seed, self.workers, tickers)
            .with_estimators(self.estimators)
            .with_ohlcv_refresh(self.refresh_ohlcv)
    }
}

pub fn run(args: BackfillArgs, database: Option<PathBuf>) {
    let database_path = get_database_path(database);
    let config = args.into_config();

    println!("📁 Database: {}", database_path.display());
    match &config.tickers {
        Some(tickers) => println!("🎯 Tickers: {}", tickers.join(", ")),
        None => println!("🎯 Tickers: all stored tickers"),
    }
    println!(
        "🌲 Isolation forest: contamination={}, seed={}, trees={}",
        config.outlier.contamination, config.outlier.seed, config.outlier.n_estimators
    );
    if !config.refresh_ohlcv {
        println!("⚠️  OHLCV refresh disabled: only features and scores are written");
    }

    match run_backfill(database_path, config) {
        Ok(report) => {
            print_report(&report);
            if report.cancelled_tickers() > 0 {
                println!("\n⏹️  Backfill interrupted");
            } else {
                println!("\n✅ Backfill completed");
            }
        }
        Err(e) => {
            eprintln!("\n❌ Backfill could not run: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_backfill(database_path: PathBuf, config: BackfillConfig) -> Result<BackfillReport> {
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Other(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let store = Arc::new(SQLiteDatabaseStore::new(database_path).await?);
        let backfill = Backfill::new(Arc::clone(&store), config)?;

        let cancel = Arc::new(AtomicBool::new(false));
        let signal_flag = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\n⏹️  Interrupt received, finishing tickers in progress...");
                signal_flag.store(true, Ordering::SeqCst);
            }
        });

        let report = backfill.run(cancel).await;
        store.close().await;
        report
    })
}

fn print_report(report: &BackfillReport) {
    println!("\n═══════════════════════════════════════════════════════════");
    for outcome in &report.outcomes {
        match &outcome.status {
            TickerStatus::Updated { rows, anomalies } => {
                println!("✅ {:<10} {:>6} rows  {:>4} anomalies", outcome.ticker, rows, anomalies);
            }
            TickerStatus::Failed(e) => {
                println!("❌ {:<10} {} ({})", outcome.ticker, e, e.kind());
            }
            TickerStatus::Cancelled => {
                println!("⏹️  {:<10} cancelled", outcome.ticker);
            }
        }
    }
    println!("═══════════════════════════════════════════════════════════");
    println!(
        "📊 {} updated, {} failed, {} cancelled | {} rows, {} anomalies in {:.2}s",
        report.updated_tickers(),
        report.failed_tickers(),
        report.cancelled_tickers(),
        report.total_rows(),
        report.total_anomalies(),
        report.duration.as_secs_f64()
    );
}
