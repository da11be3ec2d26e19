use chrono::NaiveDate;

use super::anomaly_record::{AnomalyRecord, Ticker};
use super::ohlcv::OhlcvField;

/// One ticker's persisted history, ascending by date
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub ticker: Ticker,
    pub rows: Vec<AnomalyRecord>,
}

impl PriceSeries {
    pub fn new(ticker: Ticker, mut rows: Vec<AnomalyRecord>) -> Self {
        rows.sort_by_key(|r| r.date);
        Self { ticker, rows }
    }

    pub fn symbol(&self) -> &str {
        &self.ticker.symbol
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Column of one raw field, missing where the record has no numeric value
    pub fn field(&self, field: OhlcvField) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.prices.get(field)).collect()
    }

    pub fn closes(&self) -> Vec<Option<f64>> {
        self.field(OhlcvField::Close)
    }
}
