use chrono::NaiveDate;
use sqlx::{Sqlite, Transaction};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{FeatureColumn, FeatureValues, Ohlcv, OhlcvField, Ticker};
use crate::services::database::SQLiteDatabaseStore;
use crate::services::outlier_scorer::OutlierScore;

/// One recomputed row ready to be written back
#[derive(Debug, Clone)]
pub struct RecomputedRow {
    pub date: NaiveDate,
    pub prices: Ohlcv,
    pub features: FeatureValues,
    pub score: Option<OutlierScore>,
}

/// Counts from one ticker's write pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records matched by (ticker, date) and updated
    pub updated: usize,
    /// Rows with no stored record for their date
    pub skipped: usize,
    /// Updated records flagged as anomalous
    pub flagged: usize,
}

/// Update-only writer keyed by (ticker, date)
///
/// Never inserts. Missing recomputed values leave the stored value in place,
/// and the whole pass commits as one transaction.
#[derive(Debug, Clone)]
pub struct UpsertWriter {
    refresh_ohlcv: bool,
    update_sql: String,
}

impl UpsertWriter {
    pub fn new(refresh_ohlcv: bool) -> Self {
        Self {
            refresh_ohlcv,
            update_sql: Self::update_statement(refresh_ohlcv),
        }
    }

    /// UPDATE with one `COALESCE(?, column)` per written column, bound in the same order
    fn update_statement(refresh_ohlcv: bool) -> String {
        let mut columns: Vec<&'static str> = FeatureColumn::ALL.iter().map(|c| c.column()).collect();
        if refresh_ohlcv {
            columns.extend(OhlcvField::REFRESHABLE.iter().map(|f| f.column()));
        }
        columns.push("anomaly_score");
        columns.push("anomaly");

        let assignments: Vec<String> = columns
            .iter()
            .map(|c| format!("{0} = COALESCE(?, {0})", c))
            .collect();

        format!("UPDATE anomaly SET {} WHERE id = ?", assignments.join(", "))
    }

    /// Write every row for `ticker` and commit once; on failure roll back and report a conflict
    pub async fn write(
        &self,
        store: &SQLiteDatabaseStore,
        ticker: &Ticker,
        rows: &[RecomputedRow],
    ) -> Result<WriteSummary> {
        let conflict = |e: sqlx::Error| AppError::StorageConflict {
            ticker: ticker.symbol.clone(),
            reason: e.to_string(),
        };

        let _guard = store.write_guard().await;
        let mut tx = store.begin().await.map_err(conflict)?;

        match self.apply(&mut tx, ticker.id, rows).await {
            Ok(summary) => {
                tx.commit().await.map_err(conflict)?;
                debug!(
                    ticker = %ticker.symbol,
                    updated = summary.updated,
                    skipped = summary.skipped,
                    "Committed feature update"
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(ticker = %ticker.symbol, error = %rollback_err, "Rollback failed");
                }
                Err(conflict(e))
            }
        }
    }

    async fn apply(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        ticker_id: i64,
        rows: &[RecomputedRow],
    ) -> std::result::Result<WriteSummary, sqlx::Error> {
        let mut summary = WriteSummary::default();

        for row in rows {
            let record_id: Option<i64> =
                sqlx::query_scalar("SELECT id FROM anomaly WHERE ticker_id = ?1 AND date = ?2")
                    .bind(ticker_id)
                    .bind(row.date)
                    .fetch_optional(&mut **tx)
                    .await?;

            let Some(record_id) = record_id else {
                summary.skipped += 1;
                continue;
            };

            let mut query = sqlx::query(&self.update_sql);
            for column in FeatureColumn::ALL {
                query = query.bind(row.features.get(column));
            }
            if self.refresh_ohlcv {
                for field in OhlcvField::REFRESHABLE {
                    query = query.bind(row.prices.get(field));
                }
            }
            query = query
                .bind(row.score.map(|s| s.score))
                .bind(row.score.map(|s| s.flag))
                .bind(record_id);

            query.execute(&mut **tx).await?;

            summary.updated += 1;
            if row.score.is_some_and(|s| s.flag == 1) {
                summary.flagged += 1;
            }
        }

        Ok(summary)
    }
}
