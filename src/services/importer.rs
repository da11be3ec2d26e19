//! Import of document-store exports into the relational store
//!
//! Accepts a JSON array of documents or newline-delimited JSON. Existing
//! (ticker, date) rows are never touched; anything not modeled as a column
//! is kept in the record's `meta` mapping.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::IMPORT_BATCH_SIZE;
use crate::error::{AppError, Result};
use crate::models::{AnomalyRecord, FeatureValues, Ohlcv, OhlcvField};
use crate::services::database::{coerce_json, SQLiteDatabaseStore};

/// Keys consumed by the importer itself and never copied into `meta`
const RESERVED_KEYS: [&str; 6] = ["_id", "ticker", "date", "timestamp", "anomaly", "anomaly_score"];

/// Counts from one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Documents read from the source
    pub documents: usize,
    pub imported: usize,
    /// (ticker, date) already stored
    pub skipped_existing: usize,
    /// Missing ticker, unparseable date or not an object
    pub skipped_invalid: usize,
}

/// A document mapped onto the record columns
#[derive(Debug, Clone, PartialEq)]
struct ParsedDocument {
    symbol: String,
    date: NaiveDate,
    timestamp: Option<NaiveDateTime>,
    prices: Ohlcv,
    anomaly: Option<i64>,
    anomaly_score: Option<f64>,
    meta: Value,
}

/// Import every document in `path`, committing inserts in batches
pub async fn import_documents(store: &SQLiteDatabaseStore, path: &Path) -> Result<ImportStats> {
    let start = Instant::now();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    let documents = parse_documents(&text)?;
    info!(path = %path.display(), documents = documents.len(), "Import: source loaded");

    let mut stats = ImportStats {
        documents: documents.len(),
        ..ImportStats::default()
    };

    let mut parsed = Vec::with_capacity(documents.len());
    for (index, document) in documents.iter().enumerate() {
        match parse_document(document) {
            Ok(doc) => parsed.push(doc),
            Err(reason) => {
                warn!(document = index, reason = %reason, "Import: skipping document");
                stats.skipped_invalid += 1;
            }
        }
    }

    // Tickers first, so the batch transactions below only insert records
    let mut ticker_ids: HashMap<String, i64> = HashMap::new();
    for doc in &parsed {
        if !ticker_ids.contains_key(&doc.symbol) {
            let ticker = store.get_or_create_ticker(&doc.symbol).await?;
            ticker_ids.insert(ticker.symbol, ticker.id);
        }
    }
    info!(tickers = ticker_ids.len(), "Import: tickers ready");

    let _guard = store.write_guard().await;
    let mut tx = store.begin().await?;
    let mut pending = 0usize;

    for doc in parsed {
        let Some(&ticker_id) = ticker_ids.get(&doc.symbol) else {
            stats.skipped_invalid += 1;
            continue;
        };

        let record = AnomalyRecord {
            id: 0,
            ticker_id,
            date: doc.date,
            timestamp: doc.timestamp,
            prices: doc.prices,
            features: FeatureValues::default(),
            anomaly_score: doc.anomaly_score,
            anomaly: doc.anomaly,
            meta: doc.meta,
        };

        if SQLiteDatabaseStore::insert_record_if_absent(&mut tx, &record).await? {
            stats.imported += 1;
            pending += 1;
        } else {
            debug!(ticker = %doc.symbol, date = %doc.date, "Import: record exists, skipping");
            stats.skipped_existing += 1;
        }

        if pending >= IMPORT_BATCH_SIZE {
            tx.commit().await?;
            info!(records = pending, "Import: committed batch");
            pending = 0;
            tx = store.begin().await?;
        }
    }

    tx.commit().await?;
    if pending > 0 {
        info!(records = pending, "Import: committed final batch");
    }

    info!(
        documents = stats.documents,
        imported = stats.imported,
        skipped_existing = stats.skipped_existing,
        skipped_invalid = stats.skipped_invalid,
        duration_secs = start.elapsed().as_secs_f64(),
        "Import: completed"
    );
    Ok(stats)
}

/// Split source text into documents: a JSON array, or one JSON value per line
fn parse_documents(text: &str) -> Result<Vec<Value>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| AppError::Parse(format!("Invalid JSON on line {}: {}", i + 1, e)))
        })
        .collect()
}

fn parse_document(document: &Value) -> std::result::Result<ParsedDocument, String> {
    let fields = document
        .as_object()
        .ok_or_else(|| "document is not an object".to_string())?;

    let symbol = fields
        .get("ticker")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "no ticker".to_string())?
        .to_string();

    let raw_date = fields.get("date").and_then(date_text);
    let date = raw_date
        .and_then(parse_date)
        .ok_or_else(|| format!("invalid date for {}: {:?}", symbol, fields.get("date")))?;

    let timestamp = fields
        .get("timestamp")
        .and_then(date_text)
        .and_then(parse_datetime);

    let mut prices = Ohlcv::default();
    let mut meta = Map::new();
    for (key, value) in fields {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        match price_field(key) {
            Some(field) if prices.get(field).is_none() => prices.set(field, coerce_json(value)),
            Some(_) => {}
            None => {
                meta.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(ParsedDocument {
        symbol,
        date,
        timestamp,
        prices,
        anomaly: fields.get("anomaly").and_then(coerce_flag),
        anomaly_score: fields.get("anomaly_score").and_then(coerce_json),
        meta: Value::Object(meta),
    })
}

/// Price column for a document key; accepts `adj_close` as well as `Adj Close`
fn price_field(key: &str) -> Option<OhlcvField> {
    let normalized = key.trim().to_lowercase().replace(' ', "_");
    OhlcvField::ALL
        .into_iter()
        .find(|field| field.column() == normalized)
}

/// Date text from a plain string or an extended-JSON `{"$date": ...}` wrapper
fn date_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("$date").and_then(Value::as_str),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Anomaly label as an integer; accepts numbers, booleans and numeric text
fn coerce_flag(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::tests::{day, test_store};
    use serde_json::json;
    use std::io::Write;

    fn write_source(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_document_mapping() {
        let doc = json!({
            "_id": {"$oid": "65f0c0ffee"},
            "ticker": "AAPL",
            "date": "2024-01-02",
            "timestamp": "2024-01-02T21:00:00Z",
            "close": 185.6,
            "Open": "184.2",
            "volume": 1200,
            "anomaly": true,
            "anomaly_score": "0.12",
            "sector": "tech"
        });

        let parsed = parse_document(&doc).unwrap();
        assert_eq!(parsed.symbol, "AAPL");
        assert_eq!(parsed.date, day(1));
        assert_eq!(parsed.timestamp, day(1).and_hms_opt(21, 0, 0));
        assert_eq!(parsed.prices.close, Some(185.6));
        assert_eq!(parsed.prices.open, Some(184.2));
        assert_eq!(parsed.prices.volume, Some(1200.0));
        assert_eq!(parsed.anomaly, Some(1));
        assert_eq!(parsed.anomaly_score, Some(0.12));
        assert_eq!(parsed.meta, json!({"sector": "tech"}));
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        assert!(parse_document(&json!({"date": "2024-01-01", "close": 1.0})).is_err());
        assert!(parse_document(&json!({"ticker": "  ", "date": "2024-01-01"})).is_err());
        assert!(parse_document(&json!({"ticker": "MSFT", "date": "yesterday"})).is_err());
        assert!(parse_document(&json!(["MSFT"])).is_err());
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2023, 3, 15);
        assert_eq!(parse_date("2023-03-15"), expected);
        assert_eq!(parse_date("2023-03-15 09:30:00"), expected);
        assert_eq!(parse_date("2023-03-15T09:30:00.250"), expected);
        assert_eq!(parse_date("2023-03-15T23:30:00-05:00"), NaiveDate::from_ymd_opt(2023, 3, 16));
        assert_eq!(
            parse_document(&json!({"ticker": "TSM", "date": {"$date": "2023-03-15T00:00:00Z"}}))
                .unwrap()
                .date,
            expected.unwrap()
        );
    }

    #[test]
    fn test_ndjson_and_array_sources() {
        let ndjson = "{\"ticker\":\"A\",\"date\":\"2024-01-01\"}\n\n{\"ticker\":\"B\",\"date\":\"2024-01-01\"}\n";
        assert_eq!(parse_documents(ndjson).unwrap().len(), 2);
        assert_eq!(parse_documents("[{\"ticker\":\"A\"}]").unwrap().len(), 1);
        assert!(parse_documents("   ").unwrap().is_empty());
        assert!(matches!(parse_documents("{\"a\":1}\nnot json"), Err(AppError::Parse(_))));
    }

    #[tokio::test]
    async fn test_import_skips_existing_and_invalid() {
        let (dir, store) = test_store().await;
        let source = write_source(
            dir.path(),
            "export.json",
            r#"[
                {"ticker": "NVDA", "date": "2024-01-01", "close": 480.0, "volume": "9000"},
                {"ticker": "NVDA", "date": "2024-01-02", "close": 490.5, "note": "split-adjusted"},
                {"ticker": "NVDA", "date": "2024-01-02", "close": 1.0},
                {"ticker": "AMZN", "date": "not a date", "close": 150.0},
                {"date": "2024-01-01", "close": 10.0}
            ]"#,
        );

        let stats = import_documents(&store, &source).await.unwrap();
        assert_eq!(
            stats,
            ImportStats {
                documents: 5,
                imported: 2,
                skipped_existing: 1,
                skipped_invalid: 2,
            }
        );

        let ticker = store.find_ticker("NVDA").await.unwrap().unwrap();
        let second = store.find_record(ticker.id, day(1)).await.unwrap().unwrap();
        assert_eq!(second.close(), Some(490.5));
        assert_eq!(second.meta["note"], "split-adjusted");
        assert!(store.find_ticker("AMZN").await.unwrap().is_none());

        // a second import of the same file adds nothing
        let again = import_documents(&store, &source).await.unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped_existing, 3);
        assert_eq!(store.get_record_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_import_commits_across_batches() {
        let (dir, store) = test_store().await;
        let lines: Vec<String> = (0..(IMPORT_BATCH_SIZE as i64 + 5))
            .map(|i| json!({"ticker": "META", "date": day(i).to_string(), "close": 300.0 + i as f64}).to_string())
            .collect();
        let source = write_source(dir.path(), "export.ndjson", &lines.join("\n"));

        let stats = import_documents(&store, &source).await.unwrap();
        assert_eq!(stats.imported, IMPORT_BATCH_SIZE + 5);
        assert_eq!(store.get_record_count().await.unwrap(), IMPORT_BATCH_SIZE as i64 + 5);
    }

    #[tokio::test]
    async fn test_missing_source_is_io_error() {
        let (dir, store) = test_store().await;
        let err = import_documents(&store, &dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
