use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::types::Json;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::models::indicators::finite;
use crate::models::{AnomalyRecord, FeatureColumn, FeatureValues, Ohlcv, OhlcvField, Ticker};

/// SQLite store holding tickers and their daily anomaly records
#[derive(Debug)]
pub struct SQLiteDatabaseStore {
    pool: SqlitePool,
    database_path: PathBuf,
    /// SQLite allows one writer; batch writers queue here instead of racing for the lock
    write_gate: Mutex<()>,
}

/// Database schema version for migrations
const DB_SCHEMA_VERSION: &str = "1";

/// Columns selected for every anomaly record read
const RECORD_COLUMNS: &str = "id, ticker_id, date, timestamp, \
    open, high, low, close, adj_close, volume, dividends, stock_splits, \
    returns, ma_50, ma_200, vol_20, volume_ma_20, rsi_14, \
    anomaly, anomaly_score, meta";

impl SQLiteDatabaseStore {
    /// Open (or create) the database and make sure the schema exists
    pub async fn new(database_path: PathBuf) -> Result<Self, sqlx::Error> {
        info!("Initializing SQLite database at: {:?}", database_path);

        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(sqlx::Error::Io)?;
            }
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal) // Concurrent readers during a ticker's write
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30)) // Wait 30s for locked DB
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(connect_options).await?;

        let db_store = Self {
            pool,
            database_path,
            write_gate: Mutex::new(()),
        };
        db_store.initialize_database().await?;

        info!("SQLite database initialized successfully");
        Ok(db_store)
    }

    /// Initialize database schema
    async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ticker (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS anomaly (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker_id INTEGER NOT NULL REFERENCES ticker(id),
                date DATE NOT NULL,
                timestamp DATETIME,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                adj_close REAL,
                volume REAL,
                dividends REAL,
                stock_splits REAL,
                returns REAL,
                ma_50 REAL,
                ma_200 REAL,
                vol_20 REAL,
                volume_ma_20 REAL,
                rsi_14 REAL,
                anomaly INTEGER,
                anomaly_score REAL,
                meta TEXT,
                UNIQUE (ticker_id, date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_anomaly_flag ON anomaly(ticker_id, anomaly)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)")
            .bind(DB_SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Wait for exclusive use of the write path; hold the guard until commit or rollback
    pub async fn write_guard(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().await
    }

    /// Start a transaction; dropping it without commit rolls back
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// All tickers, ascending by symbol
    pub async fn list_tickers(&self) -> Result<Vec<Ticker>, sqlx::Error> {
        let rows = sqlx::query("SELECT id, symbol FROM ticker ORDER BY symbol ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_ticker).collect()
    }

    pub async fn find_ticker(&self, symbol: &str) -> Result<Option<Ticker>, sqlx::Error> {
        let row = sqlx::query("SELECT id, symbol FROM ticker WHERE symbol = ?1")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_ticker).transpose()
    }

    /// Every record of a ticker, ascending by date
    pub async fn list_records(&self, ticker_id: i64) -> Result<Vec<AnomalyRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM anomaly WHERE ticker_id = ?1 ORDER BY date ASC",
            RECORD_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(ticker_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn find_record(
        &self,
        ticker_id: i64,
        date: NaiveDate,
    ) -> Result<Option<AnomalyRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM anomaly WHERE ticker_id = ?1 AND date = ?2",
            RECORD_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(ticker_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// Look up a ticker, inserting it on first reference
    pub async fn get_or_create_ticker(&self, symbol: &str) -> Result<Ticker, sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO ticker (symbol) VALUES (?1)")
            .bind(symbol)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id, symbol FROM ticker WHERE symbol = ?1")
            .bind(symbol)
            .fetch_one(&self.pool)
            .await?;

        row_to_ticker(&row)
    }

    /// Insert a record unless its (ticker, date) already exists. Returns whether a row was written.
    pub async fn insert_record_if_absent(
        tx: &mut Transaction<'static, Sqlite>,
        record: &AnomalyRecord,
    ) -> Result<bool, sqlx::Error> {
        let p = &record.prices;
        let f = &record.features;
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO anomaly
            (ticker_id, date, timestamp,
             open, high, low, close, adj_close, volume, dividends, stock_splits,
             returns, ma_50, ma_200, vol_20, volume_ma_20, rsi_14,
             anomaly, anomaly_score, meta)
            VALUES (?1, ?2, ?3,
                    ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                    ?12, ?13, ?14, ?15, ?16, ?17,
                    ?18, ?19, ?20)
            "#,
        )
        .bind(record.ticker_id)
        .bind(record.date)
        .bind(record.timestamp)
        .bind(p.open)
        .bind(p.high)
        .bind(p.low)
        .bind(p.close)
        .bind(p.adj_close)
        .bind(p.volume)
        .bind(p.dividends)
        .bind(p.stock_splits)
        .bind(f.get(FeatureColumn::Returns))
        .bind(f.get(FeatureColumn::Ma50))
        .bind(f.get(FeatureColumn::Ma200))
        .bind(f.get(FeatureColumn::Vol20))
        .bind(f.get(FeatureColumn::VolumeMa20))
        .bind(f.get(FeatureColumn::Rsi14))
        .bind(record.anomaly)
        .bind(record.anomaly_score)
        .bind(Json(&record.meta))
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get count of anomaly records in database
    pub async fn get_record_count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM anomaly")
            .fetch_one(&self.pool)
            .await
    }

    /// Per-ticker counts for status reporting
    pub async fn ticker_summaries(&self) -> Result<Vec<TickerSummary>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT t.symbol AS symbol,
                   COUNT(a.id) AS records,
                   COALESCE(SUM(CASE WHEN a.anomaly = 1 THEN 1 ELSE 0 END), 0) AS anomalies,
                   COALESCE(SUM(CASE WHEN a.ma_50 IS NOT NULL THEN 1 ELSE 0 END), 0) AS with_features,
                   MIN(a.date) AS first_date,
                   MAX(a.date) AS last_date
            FROM ticker t
            LEFT JOIN anomaly a ON a.ticker_id = t.id
            GROUP BY t.id, t.symbol
            ORDER BY t.symbol ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(TickerSummary {
                    symbol: row.try_get("symbol")?,
                    records: row.try_get("records")?,
                    anomalies: row.try_get("anomalies")?,
                    with_features: row.try_get("with_features")?,
                    first_date: row.try_get("first_date").ok().flatten(),
                    last_date: row.try_get("last_date").ok().flatten(),
                })
            })
            .collect()
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite database connection pool closed");
    }
}

/// Per-ticker storage statistics
#[derive(Debug, Clone)]
pub struct TickerSummary {
    pub symbol: String,
    pub records: i64,
    pub anomalies: i64,
    pub with_features: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

fn row_to_ticker(row: &SqliteRow) -> Result<Ticker, sqlx::Error> {
    Ok(Ticker {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
    })
}

/// Convert SQL row to AnomalyRecord, coercing numeric columns
fn row_to_record(row: &SqliteRow) -> Result<AnomalyRecord, sqlx::Error> {
    let meta = row
        .try_get::<Option<Json<Value>>, _>("meta")
        .ok()
        .flatten()
        .map(|json| json.0)
        .unwrap_or(Value::Null);

    let mut prices = Ohlcv::default();
    for field in OhlcvField::ALL {
        let value = coerce_column(row, field.column())
            .or_else(|| meta.get(field.column()).and_then(coerce_json));
        prices.set(field, value);
    }

    let mut features = FeatureValues::default();
    for column in FeatureColumn::ALL {
        features.set(column, coerce_column(row, column.column()));
    }

    Ok(AnomalyRecord {
        id: row.try_get("id")?,
        ticker_id: row.try_get("ticker_id")?,
        date: row.try_get("date")?,
        timestamp: row.try_get::<Option<NaiveDateTime>, _>("timestamp").ok().flatten(),
        prices,
        features,
        anomaly_score: coerce_column(row, "anomaly_score"),
        anomaly: row.try_get::<Option<i64>, _>("anomaly").ok().flatten(),
        meta,
    })
}

/// Read a column as a finite number: REAL, then INTEGER, then parsable TEXT
fn coerce_column(row: &SqliteRow, column: &str) -> Option<f64> {
    if let Ok(value) = row.try_get::<Option<f64>, _>(column) {
        return value.and_then(finite);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(column) {
        return value.map(|v| v as f64);
    }
    match row.try_get::<Option<String>, _>(column) {
        Ok(Some(text)) => parse_number(&text),
        _ => None,
    }
}

/// Coerce a JSON value to a finite number
pub fn coerce_json(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().and_then(finite)
}

/// Check if database exists
pub fn database_exists(database_path: &Path) -> bool {
    database_path.exists() && database_path.is_file()
}
