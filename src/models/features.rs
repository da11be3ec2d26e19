use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of engineered feature columns fed to the outlier scorer
pub const FEATURE_COUNT: usize = 6;

/// Engineered feature columns, in the fixed order the scorer consumes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureColumn {
    Returns,
    Ma50,
    Ma200,
    Vol20,
    VolumeMa20,
    Rsi14,
}

impl FeatureColumn {
    /// Column order of the feature matrix
    pub const ALL: [FeatureColumn; FEATURE_COUNT] = [
        FeatureColumn::Returns,
        FeatureColumn::Ma50,
        FeatureColumn::Ma200,
        FeatureColumn::Vol20,
        FeatureColumn::VolumeMa20,
        FeatureColumn::Rsi14,
    ];

    /// Position in the feature matrix
    pub fn index(&self) -> usize {
        match self {
            FeatureColumn::Returns => 0,
            FeatureColumn::Ma50 => 1,
            FeatureColumn::Ma200 => 2,
            FeatureColumn::Vol20 => 3,
            FeatureColumn::VolumeMa20 => 4,
            FeatureColumn::Rsi14 => 5,
        }
    }

    /// Storage column for this feature
    pub fn column(&self) -> &'static str {
        match self {
            FeatureColumn::Returns => "returns",
            FeatureColumn::Ma50 => "ma_50",
            FeatureColumn::Ma200 => "ma_200",
            FeatureColumn::Vol20 => "vol_20",
            FeatureColumn::VolumeMa20 => "volume_ma_20",
            FeatureColumn::Rsi14 => "rsi_14",
        }
    }
}

/// One row of derived features; a `None` cell is a missing value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureValues(pub [Option<f64>; FEATURE_COUNT]);

impl FeatureValues {
    pub fn get(&self, column: FeatureColumn) -> Option<f64> {
        self.0[column.index()]
    }

    pub fn set(&mut self, column: FeatureColumn, value: Option<f64>) {
        self.0[column.index()] = value;
    }

    /// True when at least one feature is defined
    pub fn any_defined(&self) -> bool {
        self.0.iter().any(Option::is_some)
    }
}

/// Derived features for a whole ordered series, stored column-wise
#[derive(Debug, Clone)]
pub struct FeatureTable {
    dates: Vec<NaiveDate>,
    columns: [Vec<Option<f64>>; FEATURE_COUNT],
}

impl FeatureTable {
    /// Build a table; every column must be as long as `dates`
    pub fn new(dates: Vec<NaiveDate>, columns: [Vec<Option<f64>>; FEATURE_COUNT]) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == dates.len()));
        Self { dates, columns }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column(&self, column: FeatureColumn) -> &[Option<f64>] {
        &self.columns[column.index()]
    }

    pub fn row(&self, i: usize) -> FeatureValues {
        let mut values = FeatureValues::default();
        for column in FeatureColumn::ALL {
            values.set(column, self.columns[column.index()][i]);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_order() {
        for (i, column) in FeatureColumn::ALL.iter().enumerate() {
            assert_eq!(column.index(), i);
        }
    }

    #[test]
    fn test_row_reads_across_columns() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let table = FeatureTable::new(
            vec![d],
            [
                vec![None],
                vec![Some(1.0)],
                vec![Some(2.0)],
                vec![None],
                vec![Some(4.0)],
                vec![Some(5.0)],
            ],
        );
        let row = table.row(0);
        assert_eq!(row.get(FeatureColumn::Returns), None);
        assert_eq!(row.get(FeatureColumn::Ma200), Some(2.0));
        assert_eq!(row.get(FeatureColumn::Rsi14), Some(5.0));
        assert!(row.any_defined());
    }
}
