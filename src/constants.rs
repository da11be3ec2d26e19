//! Pipeline Constants
//!
//! Default window sizes, outlier-model parameters and storage settings
//! used when the caller does not override them.
//!
//! ## Feature Windows
//! - Moving averages: 50 and 200 observations, partial windows allowed
//! - Volatility of returns: 20 observations, sample standard deviation
//! - Volume moving average: 20 observations, partial windows allowed
//! - RSI: 14 periods, full window required

/// Short moving-average window (ma_50)
pub const DEFAULT_MA_SHORT_WINDOW: usize = 50;

/// Long moving-average window (ma_200)
pub const DEFAULT_MA_LONG_WINDOW: usize = 200;

/// Rolling volatility window over returns (vol_20)
pub const DEFAULT_VOLATILITY_WINDOW: usize = 20;

/// Rolling volume average window (volume_ma_20)
pub const DEFAULT_VOLUME_WINDOW: usize = 20;

/// RSI look-back (rsi_14)
pub const DEFAULT_RSI_WINDOW: usize = 14;

/// Expected share of outliers handed to the isolation forest
pub const DEFAULT_CONTAMINATION: f64 = 0.01;

/// Seed for the isolation forest so repeated runs score identically
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Number of isolation trees
pub const DEFAULT_N_ESTIMATORS: usize = 100;

/// Upper bound on rows sampled per isolation tree
pub const DEFAULT_MAX_SAMPLES: usize = 256;

/// Upper bound on the contamination fraction
pub const MAX_CONTAMINATION: f64 = 0.5;

/// Tickers processed at once by default
pub const DEFAULT_WORKERS: usize = 1;

/// Documents inserted per import transaction
pub const IMPORT_BATCH_SIZE: usize = 1000;

/// Default SQLite database file
pub const DEFAULT_DATABASE_FILE: &str = "sfc_databank.db";

/// Environment variable overriding the database file
pub const DATABASE_ENV_VAR: &str = "STOCKPULSE_DATABASE";
