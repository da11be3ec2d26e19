use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::PriceSeries;
use crate::services::database::SQLiteDatabaseStore;

/// Load a ticker's full stored history, ascending by date
///
/// Fails with `NotFound` for an unknown symbol and `EmptyHistory` when the
/// ticker exists but has no records.
pub async fn load_series(store: &SQLiteDatabaseStore, symbol: &str) -> Result<PriceSeries> {
    let ticker = store
        .find_ticker(symbol)
        .await?
        .ok_or_else(|| AppError::NotFound(symbol.to_string()))?;

    let rows = store.list_records(ticker.id).await?;
    if rows.is_empty() {
        return Err(AppError::EmptyHistory(symbol.to_string()));
    }

    debug!(ticker = %symbol, rows = rows.len(), "Loaded price series");
    Ok(PriceSeries::new(ticker, rows))
}
