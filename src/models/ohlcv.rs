use serde::{Deserialize, Serialize};

/// Raw price/volume fields persisted on every anomaly record
///
/// Each variant maps to exactly one storage column, so the set of columns the
/// pipeline reads and writes is fixed here rather than looked up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OhlcvField {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
    Dividends,
    StockSplits,
}

impl OhlcvField {
    /// All raw fields in storage column order
    pub const ALL: [OhlcvField; 8] = [
        OhlcvField::Open,
        OhlcvField::High,
        OhlcvField::Low,
        OhlcvField::Close,
        OhlcvField::AdjClose,
        OhlcvField::Volume,
        OhlcvField::Dividends,
        OhlcvField::StockSplits,
    ];

    /// Fields the upsert writer may refresh. Close is the pipeline's input and is never rewritten.
    pub const REFRESHABLE: [OhlcvField; 7] = [
        OhlcvField::Open,
        OhlcvField::High,
        OhlcvField::Low,
        OhlcvField::AdjClose,
        OhlcvField::Volume,
        OhlcvField::Dividends,
        OhlcvField::StockSplits,
    ];

    /// Storage column (and document key) for this field
    pub fn column(&self) -> &'static str {
        match self {
            OhlcvField::Open => "open",
            OhlcvField::High => "high",
            OhlcvField::Low => "low",
            OhlcvField::Close => "close",
            OhlcvField::AdjClose => "adj_close",
            OhlcvField::Volume => "volume",
            OhlcvField::Dividends => "dividends",
            OhlcvField::StockSplits => "stock_splits",
        }
    }
}

/// Raw OHLCV values of one record, each optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
    pub dividends: Option<f64>,
    pub stock_splits: Option<f64>,
}

impl Ohlcv {
    pub fn get(&self, field: OhlcvField) -> Option<f64> {
        match field {
            OhlcvField::Open => self.open,
            OhlcvField::High => self.high,
            OhlcvField::Low => self.low,
            OhlcvField::Close => self.close,
            OhlcvField::AdjClose => self.adj_close,
            OhlcvField::Volume => self.volume,
            OhlcvField::Dividends => self.dividends,
            OhlcvField::StockSplits => self.stock_splits,
        }
    }

    pub fn set(&mut self, field: OhlcvField, value: Option<f64>) {
        let slot = match field {
            OhlcvField::Open => &mut self.open,
            OhlcvField::High => &mut self.high,
            OhlcvField::Low => &mut self.low,
            OhlcvField::Close => &mut self.close,
            OhlcvField::AdjClose => &mut self.adj_close,
            OhlcvField::Volume => &mut self.volume,
            OhlcvField::Dividends => &mut self.dividends,
            OhlcvField::StockSplits => &mut self.stock_splits,
        };
        *slot = value;
    }

    /// Create a record carrying only a close price
    pub fn with_close(close: Option<f64>) -> Self {
        Self {
            close,
            ..Self::default()
        }
    }
}
