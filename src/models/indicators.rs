//! Rolling-window indicators over series with missing values
//!
//! # Missing Value Convention
//! Every cell is an `Option<f64>`:
//! - Arithmetic on a missing operand yields missing
//! - Division by zero or any other non-finite result yields missing
//! - Rolling windows span the trailing `window` positions, average over the
//!   cells that are present, and yield missing until at least `min_periods`
//!   present cells fall inside the window
//!
//! Nothing here returns an error; undefined results are `None` and are
//! filled later by the feature conditioner.

/// Keep a value only when it is a finite number
pub fn finite(value: f64) -> Option<f64> {
    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

/// Simple returns: `close[i] / close[i-1] - 1`, missing at the first position
pub fn calculate_returns(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut returns = vec![None; closes.len()];

    for i in 1..closes.len() {
        if let (Some(curr), Some(prev)) = (closes[i], closes[i - 1]) {
            if prev != 0.0 {
                returns[i] = finite(curr / prev - 1.0);
            }
        }
    }

    returns
}

/// Present values inside the trailing window ending at `i`
fn window_values(values: &[Option<f64>], i: usize, window: usize) -> Vec<f64> {
    let start = (i + 1).saturating_sub(window);
    values[start..=i].iter().flatten().copied().collect()
}

/// Trailing rolling mean
///
/// # Arguments
/// * `values` - Series in chronological order
/// * `window` - Number of trailing positions in each window
/// * `min_periods` - Present values required before a mean is produced
pub fn rolling_mean(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            let present = window_values(values, i, window);
            if present.is_empty() || present.len() < min_periods {
                return None;
            }
            finite(present.iter().sum::<f64>() / present.len() as f64)
        })
        .collect()
}

/// Trailing rolling sample standard deviation (n - 1 denominator)
///
/// A single present value has no sample deviation, so any window with fewer
/// than two present values is missing regardless of `min_periods`.
pub fn rolling_std(values: &[Option<f64>], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            let present = window_values(values, i, window);
            let n = present.len();
            if n < 2 || n < min_periods {
                return None;
            }
            let mean = present.iter().sum::<f64>() / n as f64;
            let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            finite(variance.sqrt())
        })
        .collect()
}

/// Relative Strength Index over simple rolling averages of gains and losses
///
/// Deltas are split into gains and sign-flipped losses, each averaged over
/// exactly `period` positions with no partial windows. The first position has
/// no predecessor and counts as an unchanged day, so the first defined value
/// sits at index `period - 1`. A window without losses has no defined ratio
/// and yields missing.
pub fn calculate_rsi(closes: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    if n == 0 || period == 0 {
        return vec![None; n];
    }

    let mut gains = Vec::with_capacity(n);
    let mut losses = Vec::with_capacity(n);

    gains.push(Some(0.0));
    losses.push(Some(0.0));

    for i in 1..n {
        match (closes[i], closes[i - 1]) {
            (Some(curr), Some(prev)) => {
                let change = curr - prev;
                gains.push(Some(change.max(0.0)));
                losses.push(Some((-change).max(0.0)));
            }
            _ => {
                gains.push(None);
                losses.push(None);
            }
        }
    }

    let avg_gains = rolling_mean(&gains, period, period);
    let avg_losses = rolling_mean(&losses, period, period);

    avg_gains
        .iter()
        .zip(avg_losses.iter())
        .map(|(gain, loss)| match (gain, loss) {
            (Some(gain), Some(loss)) if *loss != 0.0 => {
                let rs = gain / loss;
                finite(100.0 - 100.0 / (1.0 + rs))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|v| Some(*v)).collect()
    }

    #[test]
    fn test_calculate_returns() {
        let returns = calculate_returns(&some(&[100.0, 110.0, 99.0]));
        assert_eq!(returns[0], None);
        assert!((returns[1].unwrap() - 0.1).abs() < 1e-12);
        assert!((returns[2].unwrap() + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_returns_propagate_missing_and_zero_division() {
        let returns = calculate_returns(&[Some(10.0), None, Some(12.0), Some(0.0), Some(5.0)]);
        assert_eq!(returns[1], None); // missing current
        assert_eq!(returns[2], None); // missing previous
        assert!((returns[3].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(returns[4], None); // previous close is zero
    }

    #[test]
    fn test_rolling_mean_partial_windows() {
        let ma3 = rolling_mean(&some(&[10.0, 11.0, 12.0, 13.0, 14.0]), 3, 1);

        assert_eq!(ma3[0], Some(10.0)); // first value is itself
        assert_eq!(ma3[1], Some(10.5));
        assert_eq!(ma3[2], Some(11.0)); // (10+11+12)/3
        assert_eq!(ma3[3], Some(12.0));
        assert_eq!(ma3[4], Some(13.0));
    }

    #[test]
    fn test_rolling_mean_skips_missing_cells() {
        let ma = rolling_mean(&[Some(2.0), None, Some(4.0), None, None, None], 3, 1);
        assert_eq!(ma[1], Some(2.0));
        assert_eq!(ma[2], Some(3.0));
        assert_eq!(ma[4], Some(4.0));
        assert_eq!(ma[5], None); // window holds no values
    }

    #[test]
    fn test_rolling_mean_min_periods() {
        let ma = rolling_mean(&some(&[1.0, 2.0, 3.0]), 3, 3);
        assert_eq!(ma, vec![None, None, Some(2.0)]);
    }

    #[test]
    fn test_rolling_std_sample_convention() {
        let std = rolling_std(&[None, Some(1.0), Some(3.0), Some(5.0)], 3, 1);
        assert_eq!(std[0], None);
        assert_eq!(std[1], None); // single observation
        assert!((std[2].unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((std[3].unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_alternating_series() {
        let closes: Vec<Option<f64>> = (0..14)
            .map(|i| Some(if i % 2 == 0 { 10.0 } else { 11.0 }))
            .collect();
        let rsi = calculate_rsi(&closes, 14);

        for value in &rsi[..13] {
            assert_eq!(*value, None);
        }
        // 7 gains and 6 losses of 1.0: rs = 7/6
        let expected = 100.0 - 100.0 / (1.0 + 7.0 / 6.0);
        assert!((rsi[13].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_without_losses_is_missing() {
        let closes: Vec<Option<f64>> = (0..20).map(|i| Some(100.0 + i as f64)).collect();
        let rsi = calculate_rsi(&closes, 14);
        assert!(rsi.iter().all(Option::is_none));
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let closes: Vec<Option<f64>> = (0..15).map(|i| Some(100.0 - i as f64)).collect();
        let rsi = calculate_rsi(&closes, 14);
        assert_eq!(rsi[13], Some(0.0));
        assert_eq!(rsi[14], Some(0.0));
    }

    #[test]
    fn test_rsi_missing_close_blanks_windows() {
        let mut closes: Vec<Option<f64>> = (0..30)
            .map(|i| Some(if i % 2 == 0 { 10.0 } else { 11.0 }))
            .collect();
        closes[15] = None;
        let rsi = calculate_rsi(&closes, 14);
        assert!(rsi[14].is_some());
        // deltas 15 and 16 are missing, so windows covering them are not full
        for value in &rsi[15..30] {
            assert_eq!(*value, None);
        }
    }
}
