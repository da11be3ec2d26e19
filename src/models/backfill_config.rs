use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CONTAMINATION, DEFAULT_MAX_SAMPLES, DEFAULT_MA_LONG_WINDOW, DEFAULT_MA_SHORT_WINDOW,
    DEFAULT_N_ESTIMATORS, DEFAULT_RANDOM_SEED, DEFAULT_RSI_WINDOW, DEFAULT_VOLATILITY_WINDOW,
    DEFAULT_VOLUME_WINDOW, DEFAULT_WORKERS, MAX_CONTAMINATION,
};
use crate::error::{AppError, Result};

/// Rolling-window sizes for the feature engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureWindows {
    /// Window for ma_50
    pub ma_short: usize,
    /// Window for ma_200
    pub ma_long: usize,
    /// Window for vol_20
    pub volatility: usize,
    /// Window for volume_ma_20
    pub volume: usize,
    /// Look-back for rsi_14
    pub rsi: usize,
}

impl Default for FeatureWindows {
    fn default() -> Self {
        Self {
            ma_short: DEFAULT_MA_SHORT_WINDOW,
            ma_long: DEFAULT_MA_LONG_WINDOW,
            volatility: DEFAULT_VOLATILITY_WINDOW,
            volume: DEFAULT_VOLUME_WINDOW,
            rsi: DEFAULT_RSI_WINDOW,
        }
    }
}

/// Isolation forest parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierParams {
    /// Expected share of outliers, in (0, 0.5]
    pub contamination: f64,
    pub seed: u64,
    pub n_estimators: usize,
    /// Rows sampled per tree (capped by the series length)
    pub max_samples: usize,
}

impl Default for OutlierParams {
    fn default() -> Self {
        Self {
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_RANDOM_SEED,
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// Configuration for a backfill run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    pub windows: FeatureWindows,

    pub outlier: OutlierParams,

    /// Write coerced OHLCV values back to their columns
    pub refresh_ohlcv: bool,

    /// Tickers processed concurrently
    pub workers: usize,

    /// Ticker scope; `None` processes every stored ticker
    pub tickers: Option<Vec<String>>,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            windows: FeatureWindows::default(),
            outlier: OutlierParams::default(),
            refresh_ohlcv: true,
            workers: DEFAULT_WORKERS,
            tickers: None,
        }
    }
}

impl BackfillConfig {
    /// Create new config with custom outlier parameters
    pub fn new(contamination: f64, seed: u64, workers: usize, tickers: Option<Vec<String>>) -> Self {
        Self {
            outlier: OutlierParams {
                contamination,
                seed,
                ..OutlierParams::default()
            },
            workers,
            tickers,
            ..Self::default()
        }
    }

    pub fn with_windows(mut self, windows: FeatureWindows) -> Self {
        self.windows = windows;
        self
    }

    pub fn with_estimators(mut self, n_estimators: usize) -> Self {
        self.outlier.n_estimators = n_estimators;
        self
    }

    pub fn with_ohlcv_refresh(mut self, refresh_ohlcv: bool) -> Self {
        self.refresh_ohlcv = refresh_ohlcv;
        self
    }

    /// Reject parameter values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let c = self.outlier.contamination;
        if !(c > 0.0 && c <= MAX_CONTAMINATION) {
            return Err(AppError::Config(format!(
                "contamination must be in (0, {}], got {}",
                MAX_CONTAMINATION, c
            )));
        }
        if self.outlier.n_estimators == 0 {
            return Err(AppError::Config("n_estimators must be at least 1".to_string()));
        }
        if self.outlier.max_samples == 0 {
            return Err(AppError::Config("max_samples must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(AppError::Config("workers must be at least 1".to_string()));
        }

        let w = &self.windows;
        if [w.ma_short, w.ma_long, w.volatility, w.volume, w.rsi].contains(&0) {
            return Err(AppError::Config("window sizes must be at least 1".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BackfillConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.windows.ma_short, 50);
        assert_eq!(config.windows.rsi, 14);
        assert_eq!(config.outlier.seed, 42);
    }

    #[test]
    fn test_rejects_bad_contamination() {
        assert!(BackfillConfig::new(0.0, 42, 1, None).validate().is_err());
        assert!(BackfillConfig::new(0.6, 42, 1, None).validate().is_err());
        assert!(BackfillConfig::new(f64::NAN, 42, 1, None).validate().is_err());
        assert!(BackfillConfig::new(0.5, 42, 1, None).validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_window() {
        let windows = FeatureWindows {
            rsi: 0,
            ..FeatureWindows::default()
        };
        let config = BackfillConfig::default().with_windows(windows);
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
