mod anomaly_record;
mod backfill_config;
mod features;
mod ohlcv;
mod price_series;
pub mod indicators;

pub use anomaly_record::{AnomalyRecord, Ticker};
pub use backfill_config::{BackfillConfig, FeatureWindows, OutlierParams};
pub use features::{FeatureColumn, FeatureTable, FeatureValues, FEATURE_COUNT};
pub use ohlcv::{Ohlcv, OhlcvField};
pub use price_series::PriceSeries;
