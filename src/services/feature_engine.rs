//! Feature Engine
//!
//! Derives the six indicator columns from a ticker's ordered price series:
//! - returns: day-over-day close change
//! - ma_50 / ma_200: close moving averages, partial windows allowed
//! - vol_20: sample standard deviation of returns, partial windows allowed
//! - volume_ma_20: volume moving average, partial windows allowed
//! - rsi_14: relative strength index, full window required

use crate::error::{AppError, Result};
use crate::models::indicators::{calculate_returns, calculate_rsi, rolling_mean, rolling_std};
use crate::models::{FeatureTable, FeatureWindows, OhlcvField, PriceSeries};

/// Compute the feature table for a whole series
///
/// Returns `InsufficientData` when no close price is present; every other
/// gap in the input becomes a missing cell.
pub fn compute_features(series: &PriceSeries, windows: &FeatureWindows) -> Result<FeatureTable> {
    let closes = series.closes();
    if closes.iter().all(Option::is_none) {
        return Err(AppError::InsufficientData(series.symbol().to_string()));
    }

    let volumes = series.field(OhlcvField::Volume);

    let returns = calculate_returns(&closes);
    let ma_short = rolling_mean(&closes, windows.ma_short, 1);
    let ma_long = rolling_mean(&closes, windows.ma_long, 1);
    let volatility = rolling_std(&returns, windows.volatility, 1);
    let volume_ma = rolling_mean(&volumes, windows.volume, 1);
    let rsi = calculate_rsi(&closes, windows.rsi);

    Ok(FeatureTable::new(
        series.dates(),
        [returns, ma_short, ma_long, volatility, volume_ma, rsi],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyRecord, FeatureColumn, FeatureValues, Ohlcv, Ticker};
    use chrono::NaiveDate;
    use serde_json::Value;

    fn series(closes: &[Option<f64>], volumes: Option<&[f64]>) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let rows = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let mut prices = Ohlcv::with_close(*close);
                prices.volume = volumes.map(|v| v[i]);
                AnomalyRecord {
                    id: i as i64 + 1,
                    ticker_id: 1,
                    date: start + chrono::Duration::days(i as i64),
                    timestamp: None,
                    prices,
                    features: FeatureValues::default(),
                    anomaly_score: None,
                    anomaly: None,
                    meta: Value::Null,
                }
            })
            .collect();
        PriceSeries::new(
            Ticker {
                id: 1,
                symbol: "TEST".to_string(),
            },
            rows,
        )
    }

    fn rising(n: usize) -> Vec<Option<f64>> {
        (0..n).map(|i| Some(100.0 + i as f64)).collect()
    }

    #[test]
    fn test_all_missing_close_is_insufficient() {
        let s = series(&[None, None, None], None);
        let err = compute_features(&s, &FeatureWindows::default()).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(ref t) if t == "TEST"));
    }

    #[test]
    fn test_moving_averages_start_at_first_close() {
        let s = series(&rising(60), None);
        let table = compute_features(&s, &FeatureWindows::default()).unwrap();

        assert_eq!(table.column(FeatureColumn::Ma50)[0], Some(100.0));
        assert_eq!(table.column(FeatureColumn::Ma200)[0], Some(100.0));
        // full 50-window at index 59 covers closes 110..=159
        let ma50 = table.column(FeatureColumn::Ma50)[59].unwrap();
        assert!((ma50 - 134.5).abs() < 1e-9);
        // ma_200 still uses every available close
        let ma200 = table.column(FeatureColumn::Ma200)[59].unwrap();
        assert!((ma200 - 129.5).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_needs_two_returns() {
        let s = series(&rising(5), None);
        let table = compute_features(&s, &FeatureWindows::default()).unwrap();
        let vol = table.column(FeatureColumn::Vol20);
        assert_eq!(vol[0], None);
        assert_eq!(vol[1], None);
        assert!(vol[2].is_some());
    }

    #[test]
    fn test_volume_absent_gives_missing_column() {
        let s = series(&rising(10), None);
        let table = compute_features(&s, &FeatureWindows::default()).unwrap();
        assert!(table.column(FeatureColumn::VolumeMa20).iter().all(Option::is_none));
    }

    #[test]
    fn test_volume_moving_average() {
        let volumes = [100.0, 200.0, 300.0];
        let s = series(&rising(3), Some(&volumes));
        let table = compute_features(&s, &FeatureWindows::default()).unwrap();
        assert_eq!(
            table.column(FeatureColumn::VolumeMa20),
            &[Some(100.0), Some(150.0), Some(200.0)]
        );
    }

    #[test]
    fn test_rsi_definedness() {
        let closes: Vec<Option<f64>> = (0..40)
            .map(|i| Some(100.0 + (i % 3) as f64 - (i % 2) as f64))
            .collect();
        let s = series(&closes, None);
        let table = compute_features(&s, &FeatureWindows::default()).unwrap();
        let rsi = table.column(FeatureColumn::Rsi14);

        assert!(rsi[..13].iter().all(Option::is_none));
        assert!(rsi[13..].iter().all(Option::is_some));
        assert!(rsi[13..].iter().flatten().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_gap_in_close_propagates_to_returns() {
        let s = series(&[Some(10.0), None, Some(12.0), Some(13.2)], None);
        let table = compute_features(&s, &FeatureWindows::default()).unwrap();
        let returns = table.column(FeatureColumn::Returns);
        assert_eq!(&returns[..3], &[None, None, None]);
        assert!((returns[3].unwrap() - 0.1).abs() < 1e-9);
        // moving average over the gap uses the closes that are present
        assert_eq!(table.column(FeatureColumn::Ma50)[1], Some(10.0));
    }
}
