use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::models::OutlierParams;
use crate::services::isolation_forest::IsolationForest;
use crate::services::scaler::StandardScaler;

/// Score for one row: higher `score` = more anomalous, `flag` 1 = anomalous
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierScore {
    pub score: f64,
    pub flag: i64,
}

/// Standardizes a conditioned feature matrix and scores it with a fresh isolation forest
#[derive(Debug, Clone)]
pub struct OutlierScorer {
    params: OutlierParams,
}

impl OutlierScorer {
    pub fn new(params: OutlierParams) -> Self {
        Self { params }
    }

    /// Fit on `matrix` and score the same rows in one pass
    ///
    /// The scaler and forest live only for this call. Output rows align
    /// one-to-one with the input rows.
    pub fn fit_score(&self, matrix: &Array2<f64>) -> Vec<OutlierScore> {
        let (_, scaled) = StandardScaler::fit_transform(matrix);
        let forest = IsolationForest::new(&self.params).fit(&scaled);

        let decision = forest.decision_function(&scaled);
        let labels = forest.predict(&scaled);

        decision
            .iter()
            .zip(labels)
            .map(|(&d, label)| OutlierScore {
                score: -d,
                flag: if label == -1 { 1 } else { 0 },
            })
            .collect()
    }
}
