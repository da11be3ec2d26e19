pub mod backfill;
pub mod conditioner;
pub mod database;
pub mod feature_engine;
pub mod importer;
pub mod isolation_forest;
pub mod outlier_scorer;
pub mod scaler;
pub mod series_loader;
pub mod upsert_writer;

pub use backfill::{recompute, Backfill, BackfillReport, CancelFlag, TickerOutcome, TickerStatus};
pub use conditioner::condition;
pub use database::{SQLiteDatabaseStore, TickerSummary};
pub use feature_engine::compute_features;
pub use importer::{import_documents, ImportStats};
pub use isolation_forest::{FittedIsolationForest, IsolationForest};
pub use outlier_scorer::{OutlierScore, OutlierScorer};
pub use scaler::StandardScaler;
pub use series_loader::load_series;
pub use upsert_writer::{RecomputedRow, UpsertWriter, WriteSummary};
