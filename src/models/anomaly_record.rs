use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::features::FeatureValues;
use super::ohlcv::Ohlcv;

/// A tracked symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub id: i64,
    pub symbol: String,
}

/// One persisted daily row for a ticker, unique per (ticker, date)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub id: i64,
    pub ticker_id: i64,
    pub date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,

    /// Raw prices, already coerced to numbers (non-numeric values are `None`)
    pub prices: Ohlcv,

    /// Derived indicators from the last backfill
    pub features: FeatureValues,

    /// Continuous outlier score, higher = more anomalous
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,

    /// 1 = anomalous, 0 = normal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<i64>,

    /// Fields the import carried that have no dedicated column
    #[serde(default)]
    pub meta: Value,
}

impl AnomalyRecord {
    pub fn close(&self) -> Option<f64> {
        self.prices.close
    }

    pub fn is_anomaly(&self) -> bool {
        self.anomaly == Some(1)
    }
}
