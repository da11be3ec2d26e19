use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AppError, Result};
use crate::models::{BackfillConfig, FeatureWindows, OutlierParams, PriceSeries};
use crate::services::conditioner::condition;
use crate::services::database::SQLiteDatabaseStore;
use crate::services::feature_engine::compute_features;
use crate::services::outlier_scorer::OutlierScorer;
use crate::services::series_loader::load_series;
use crate::services::upsert_writer::{RecomputedRow, UpsertWriter, WriteSummary};

/// Shared flag checked before each ticker starts
pub type CancelFlag = Arc<AtomicBool>;

/// What happened to one ticker during a run
#[derive(Debug)]
pub enum TickerStatus {
    Updated { rows: usize, anomalies: usize },
    Failed(AppError),
    Cancelled,
}

#[derive(Debug)]
pub struct TickerOutcome {
    pub ticker: String,
    pub status: TickerStatus,
}

/// Result of a backfill run, one outcome per ticker in scope
#[derive(Debug, Default)]
pub struct BackfillReport {
    pub outcomes: Vec<TickerOutcome>,
    pub duration: Duration,
}

impl BackfillReport {
    pub fn updated_tickers(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TickerStatus::Updated { .. }))
            .count()
    }

    pub fn failed_tickers(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TickerStatus::Failed(_)))
            .count()
    }

    pub fn cancelled_tickers(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, TickerStatus::Cancelled))
            .count()
    }

    /// Rows written across all updated tickers
    pub fn total_rows(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TickerStatus::Updated { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn total_anomalies(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                TickerStatus::Updated { anomalies, .. } => anomalies,
                _ => 0,
            })
            .sum()
    }

    pub fn outcome(&self, ticker: &str) -> Option<&TickerOutcome> {
        self.outcomes.iter().find(|o| o.ticker == ticker)
    }
}

/// Feature, conditioning and scoring stages for one loaded series
///
/// Pure CPU work; rows come back in series order with a score on every row.
pub fn recompute(
    series: &PriceSeries,
    windows: &FeatureWindows,
    params: OutlierParams,
) -> Result<Vec<RecomputedRow>> {
    let table = compute_features(series, windows)?;
    let matrix = condition(&table);
    let scores = OutlierScorer::new(params).fit_score(&matrix);

    Ok(series
        .rows
        .iter()
        .zip(scores)
        .enumerate()
        .map(|(i, (record, score))| RecomputedRow {
            date: record.date,
            prices: record.prices,
            features: table.row(i),
            score: Some(score),
        })
        .collect())
}

/// Recomputes features and anomaly scores for stored tickers
#[derive(Debug, Clone)]
pub struct Backfill {
    store: Arc<SQLiteDatabaseStore>,
    config: BackfillConfig,
    writer: UpsertWriter,
}

impl Backfill {
    pub fn new(store: Arc<SQLiteDatabaseStore>, config: BackfillConfig) -> Result<Self> {
        config.validate()?;
        let writer = UpsertWriter::new(config.refresh_ohlcv);
        Ok(Self {
            store,
            config,
            writer,
        })
    }

    pub fn config(&self) -> &BackfillConfig {
        &self.config
    }

    /// Load, recompute and write back one ticker
    #[instrument(skip(self))]
    pub async fn run_ticker(&self, symbol: &str) -> Result<WriteSummary> {
        let series = load_series(&self.store, symbol).await?;
        let ticker = series.ticker.clone();

        let windows = self.config.windows;
        let params = self.config.outlier;
        let rows = tokio::task::spawn_blocking(move || recompute(&series, &windows, params))
            .await
            .map_err(|e| AppError::Other(format!("Scoring task for {} failed: {}", ticker.symbol, e)))??;

        debug!(ticker = %symbol, rows = rows.len(), "Recomputed features and scores");

        let summary = self.writer.write(&self.store, &ticker, &rows).await?;
        info!(
            ticker = %symbol,
            updated = summary.updated,
            skipped = summary.skipped,
            anomalies = summary.flagged,
            "Backfill: ticker updated"
        );
        Ok(summary)
    }

    /// Run every ticker in scope, isolating failures per ticker
    ///
    /// Only failing to enumerate tickers aborts the run. Once `cancel` is set,
    /// tickers that have not started yet are reported as cancelled.
    pub async fn run(&self, cancel: CancelFlag) -> Result<BackfillReport> {
        let start = Instant::now();
        let symbols = self.resolve_symbols().await?;
        info!(
            tickers = symbols.len(),
            workers = self.config.workers,
            "Backfill: starting"
        );

        let mut outcomes: Vec<TickerOutcome> = stream::iter(symbols)
            .map(|symbol| {
                let cancel = Arc::clone(&cancel);
                async move {
                    if cancel.load(Ordering::SeqCst) {
                        debug!(ticker = %symbol, "Backfill: skipped after cancellation");
                        return TickerOutcome {
                            ticker: symbol,
                            status: TickerStatus::Cancelled,
                        };
                    }

                    let status = match self.run_ticker(&symbol).await {
                        Ok(summary) => TickerStatus::Updated {
                            rows: summary.updated,
                            anomalies: summary.flagged,
                        },
                        Err(e) => {
                            if e.is_per_ticker() {
                                warn!(ticker = %symbol, kind = e.kind(), error = %e, "Backfill: ticker failed");
                            } else {
                                error!(ticker = %symbol, kind = e.kind(), error = %e, "Backfill: ticker failed");
                            }
                            TickerStatus::Failed(e)
                        }
                    };
                    TickerOutcome {
                        ticker: symbol,
                        status,
                    }
                }
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        outcomes.sort_by(|a, b| a.ticker.cmp(&b.ticker));

        let report = BackfillReport {
            outcomes,
            duration: start.elapsed(),
        };
        info!(
            updated = report.updated_tickers(),
            failed = report.failed_tickers(),
            cancelled = report.cancelled_tickers(),
            rows = report.total_rows(),
            anomalies = report.total_anomalies(),
            duration_secs = report.duration.as_secs_f64(),
            "Backfill: completed"
        );
        Ok(report)
    }

    /// Explicit scope in first-seen order, else every stored ticker
    async fn resolve_symbols(&self) -> Result<Vec<String>> {
        match &self.config.tickers {
            Some(requested) => {
                let mut symbols: Vec<String> = Vec::with_capacity(requested.len());
                for symbol in requested {
                    let symbol = symbol.trim();
                    if !symbol.is_empty() && !symbols.iter().any(|s| s == symbol) {
                        symbols.push(symbol.to_string());
                    }
                }
                Ok(symbols)
            }
            None => Ok(self
                .store
                .list_tickers()
                .await?
                .into_iter()
                .map(|t| t.symbol)
                .collect()),
        }
    }
}
