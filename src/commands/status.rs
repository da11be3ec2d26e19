use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::services::database::database_exists;
use crate::services::{SQLiteDatabaseStore, TickerSummary};
use crate::utils::get_database_path;

pub fn run(database: Option<PathBuf>) {
    let database_path = get_database_path(database);
    println!("📊 Anomaly Store Status\n");

    if !database_exists(&database_path) {
        println!("⚠️  No database at {}. Run 'import' first.", database_path.display());
        return;
    }

    match load_summaries(database_path) {
        Ok(summaries) => show_summaries(&summaries),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_summaries(database_path: PathBuf) -> Result<Vec<TickerSummary>> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Other(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let store = SQLiteDatabaseStore::new(database_path).await?;
        let summaries = store.ticker_summaries().await;
        store.close().await;
        summaries.map_err(AppError::from)
    })
}

fn show_summaries(summaries: &[TickerSummary]) {
    if summaries.is_empty() {
        println!("⚠️  No tickers stored. Run 'import' first.");
        return;
    }

    println!("📈 Total Tickers: {}\n", summaries.len());
    println!("═══════════════════════════════════════════════════════════");

    for summary in summaries {
        let range = match (&summary.first_date, &summary.last_date) {
            (Some(first), Some(last)) => format!("{} → {}", first, last),
            _ => "no records".to_string(),
        };
        println!(
            "🔹 {:<8} {:>8} records  {:>5} anomalies  {:>8} with features  ({})",
            summary.symbol,
            format_number(summary.records),
            summary.anomalies,
            format_number(summary.with_features),
            range
        );
    }

    println!("═══════════════════════════════════════════════════════════");
    let total: i64 = summaries.iter().map(|s| s.records).sum();
    let flagged: i64 = summaries.iter().map(|s| s.anomalies).sum();
    println!("💡 {} records, {} flagged as anomalous", format_number(total), flagged);
}

/// Thousands separators for record counts
fn format_number(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }
}
