//! Isolation Forest anomaly detection
//!
//! Anomalies are easier to isolate by random axis-aligned splits, so they
//! end up closer to the root of each tree. Fitting returns an explicit
//! `FittedIsolationForest` value; nothing is cached between calls.
//!
//! Score conventions:
//! - `score_samples`: `-2^(-E[h(x)] / c(n))`, lower = more abnormal
//! - `decision_function`: `score_samples - offset`, negative = outlier
//! - `predict`: `-1` for outliers, `1` for inliers

use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;

use crate::models::OutlierParams;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// A node in an isolation tree
#[derive(Debug, Clone)]
enum IsolationNode {
    /// Internal node with split information
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Leaf node with size (number of samples)
    Leaf { size: usize },
}

/// Single isolation tree
#[derive(Debug, Clone)]
struct IsolationTree {
    root: IsolationNode,
}

impl IsolationTree {
    /// Build an isolation tree over the given row indices
    fn build(data: &Array2<f64>, indices: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let root = Self::build_node(data, indices, 0, max_depth, rng);
        Self { root }
    }

    /// Recursively build tree nodes
    fn build_node(
        data: &Array2<f64>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> IsolationNode {
        let n_samples = indices.len();

        if depth >= max_depth || n_samples <= 1 {
            return IsolationNode::Leaf { size: n_samples };
        }

        // Only features that still vary inside this node can split it
        let candidates: Vec<(usize, f64, f64)> = (0..data.ncols())
            .filter_map(|feature| {
                let (min_val, max_val) = indices.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), &i| (lo.min(data[[i, feature]]), hi.max(data[[i, feature]])),
                );
                (max_val > min_val).then_some((feature, min_val, max_val))
            })
            .collect();

        if candidates.is_empty() {
            return IsolationNode::Leaf { size: n_samples };
        }

        let (feature, min_val, max_val) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(min_val..max_val);

        // threshold < max keeps both sides non-empty
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data[[i, feature]] <= threshold);

        let left = Self::build_node(data, left_indices, depth + 1, max_depth, rng);
        let right = Self::build_node(data, right_indices, depth + 1, max_depth, rng);

        IsolationNode::Internal {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Path length of one sample, corrected for unexpanded leaves
    fn path_length(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        let mut depth = 0usize;

        loop {
            match node {
                IsolationNode::Leaf { size } => return depth as f64 + average_path_length(*size),
                IsolationNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                    depth += 1;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` items
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        0.0
    } else if n == 2 {
        1.0
    } else {
        let n = n as f64;
        2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
    }
}

/// Linear-interpolated percentile (`q` in 0..=100)
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Isolation Forest parameters
#[derive(Debug, Clone)]
pub struct IsolationForest {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum number of samples per tree
    pub max_samples: usize,
    /// Contamination rate (expected proportion of anomalies)
    pub contamination: f64,
    /// Random seed
    pub seed: u64,
}

impl IsolationForest {
    pub fn new(params: &OutlierParams) -> Self {
        Self {
            n_estimators: params.n_estimators,
            max_samples: params.max_samples,
            contamination: params.contamination,
            seed: params.seed,
        }
    }

    /// Grow the forest on `data` and derive the outlier offset from its scores
    pub fn fit(&self, data: &Array2<f64>) -> FittedIsolationForest {
        let n_samples = data.nrows();
        let sample_size = self.max_samples.min(n_samples).max(1);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;

        let mut rng = StdRng::seed_from_u64(self.seed);

        let trees = if n_samples == 0 {
            Vec::new()
        } else {
            (0..self.n_estimators)
                .map(|_| {
                    let indices: Vec<usize> =
                        (0..n_samples).choose_multiple(&mut rng, sample_size);
                    IsolationTree::build(data, indices, max_depth, &mut rng)
                })
                .collect()
        };

        let mut fitted = FittedIsolationForest {
            trees,
            sample_size,
            offset: 0.0,
        };

        let train_scores = fitted.score_samples(data);
        fitted.offset = percentile(
            train_scores.as_slice().unwrap_or(&[]),
            100.0 * self.contamination,
        );
        fitted
    }
}

/// A grown forest together with its outlier offset
#[derive(Debug, Clone)]
pub struct FittedIsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl FittedIsolationForest {
    /// Opposite of the anomaly score; lower = more abnormal
    pub fn score_samples(&self, data: &Array2<f64>) -> Array1<f64> {
        let c = average_path_length(self.sample_size);

        data.rows()
            .into_iter()
            .map(|sample| {
                if self.trees.is_empty() || c <= 0.0 {
                    return -0.5;
                }
                let avg_path_length = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(sample))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                -(2.0_f64.powf(-avg_path_length / c))
            })
            .collect()
    }

    /// Shifted score; negative = outlier, positive = inlier
    pub fn decision_function(&self, data: &Array2<f64>) -> Array1<f64> {
        self.score_samples(data) - self.offset
    }

    /// `-1` for outliers, `1` for inliers
    pub fn predict(&self, data: &Array2<f64>) -> Vec<i8> {
        self.decision_function(data)
            .iter()
            .map(|&d| if d < 0.0 { -1 } else { 1 })
            .collect()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
