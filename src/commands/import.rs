use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::services::{import_documents, ImportStats, SQLiteDatabaseStore};
use crate::utils::get_database_path;

pub fn run(source: PathBuf, database: Option<PathBuf>) {
    let database_path = get_database_path(database);

    println!("📁 Source: {}", source.display());
    println!("🗄️  Database: {}", database_path.display());

    if !source.exists() {
        eprintln!("❌ Error: Source file does not exist: {}", source.display());
        std::process::exit(1);
    }

    match run_import(source, database_path) {
        Ok(stats) => {
            println!("\n📥 Documents read:      {}", stats.documents);
            println!("   Imported:            {}", stats.imported);
            println!("   Already stored:      {}", stats.skipped_existing);
            println!("   Invalid (skipped):   {}", stats.skipped_invalid);
            println!("\n🎉 Import completed successfully!");
        }
        Err(e) => {
            eprintln!("\n❌ Import failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_import(source: PathBuf, database_path: PathBuf) -> Result<ImportStats> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| AppError::Other(format!("Failed to create runtime: {}", e)))?;

    runtime.block_on(async {
        let store = SQLiteDatabaseStore::new(database_path).await?;
        let stats = import_documents(&store, &source).await;
        store.close().await;
        stats
    })
}
