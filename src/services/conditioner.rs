use ndarray::Array2;

use crate::models::{FeatureColumn, FeatureTable, FEATURE_COUNT};

/// Median of the present values, averaging the middle pair for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    if n % 2 == 0 {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Some(sorted[n / 2])
    }
}

/// Turn the feature table into a dense matrix the scorer can consume
///
/// Per column: infinities become missing, missing cells take the column
/// median, and a column with no values at all is filled with 0.0. Rows keep
/// the series order and columns keep `FeatureColumn::ALL` order.
pub fn condition(table: &FeatureTable) -> Array2<f64> {
    let mut matrix = Array2::zeros((table.len(), FEATURE_COUNT));

    for column in FeatureColumn::ALL {
        let cells: Vec<Option<f64>> = table
            .column(column)
            .iter()
            .map(|cell| cell.filter(|v| v.is_finite()))
            .collect();

        let present: Vec<f64> = cells.iter().flatten().copied().collect();
        let fill = median(&present).unwrap_or(0.0);

        for (i, cell) in cells.iter().enumerate() {
            matrix[[i, column.index()]] = cell.unwrap_or(fill);
        }
    }

    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_fills_missing_and_infinite_with_median() {
        let table = FeatureTable::new(
            dates(4),
            [
                vec![None, Some(1.0), Some(f64::INFINITY), Some(3.0)],
                vec![Some(5.0); 4],
                vec![Some(f64::NEG_INFINITY), Some(2.0), Some(4.0), Some(6.0)],
                vec![None; 4],
                vec![Some(1.0), None, None, None],
                vec![None, None, None, Some(55.0)],
            ],
        );

        let m = condition(&table);
        assert_eq!(m.dim(), (4, FEATURE_COUNT));
        assert_eq!(m.column(0).to_vec(), vec![2.0, 1.0, 2.0, 3.0]);
        assert_eq!(m.column(1).to_vec(), vec![5.0; 4]);
        assert_eq!(m.column(2).to_vec(), vec![4.0, 2.0, 4.0, 6.0]);
        assert_eq!(m.column(3).to_vec(), vec![0.0; 4]);
        assert_eq!(m.column(4).to_vec(), vec![1.0; 4]);
        assert_eq!(m.column(5).to_vec(), vec![55.0; 4]);
    }

    #[test]
    fn test_output_is_always_finite() {
        let table = FeatureTable::new(
            dates(3),
            [
                vec![None; 3],
                vec![Some(f64::NAN), Some(f64::INFINITY), None],
                vec![None; 3],
                vec![None; 3],
                vec![None; 3],
                vec![None; 3],
            ],
        );

        let m = condition(&table);
        assert!(m.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_empty_table() {
        let table = FeatureTable::new(vec![], [vec![], vec![], vec![], vec![], vec![], vec![]]);
        assert_eq!(condition(&table).dim(), (0, FEATURE_COUNT));
    }
}
