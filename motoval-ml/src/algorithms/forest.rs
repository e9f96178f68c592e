//! Random forest regressor: bootstrap-aggregated regression trees.
//!
//! Tree `i` draws its bootstrap sample and feature order from an RNG seeded
//! with `seed + i`, so the fitted forest is identical however rayon schedules
//! the work.

use crate::algorithms::tree::{RegressionTree, TreeParams};
use crate::error::MlError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub seed: u64,
    pub bootstrap: bool,
    pub tree: TreeParams,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            seed: 42,
            bootstrap: true,
            tree: TreeParams::default(),
        }
    }
}

/// A fitted random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit on a dense row-major matrix.
    pub fn fit(params: ForestParams, x: &[Vec<f64>], y: &[f64]) -> Result<Self, MlError> {
        if x.is_empty() {
            return Err(MlError::training("cannot fit a forest on zero rows"));
        }
        if x.len() != y.len() {
            return Err(MlError::training(format!(
                "feature rows ({}) and targets ({}) differ",
                x.len(),
                y.len()
            )));
        }
        if params.n_estimators == 0 {
            return Err(MlError::Config("n_estimators must be at least 1".into()));
        }
        let n_features = x[0].len();
        if let Some(row) = x.iter().position(|r| r.len() != n_features) {
            return Err(MlError::training(format!(
                "row {row} has {} features, expected {n_features}",
                x[row].len()
            )));
        }
        if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
            return Err(MlError::training("training data contains non-finite values"));
        }

        let n_rows = x.len();
        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let samples = if params.bootstrap {
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                RegressionTree::fit(x, y, samples, &params.tree, &mut rng)
            })
            .collect();

        tracing::debug!(
            trees = trees.len(),
            rows = n_rows,
            features = n_features,
            mean_nodes = trees.iter().map(RegressionTree::node_count).sum::<usize>() / trees.len(),
            "fitted random forest"
        );

        Ok(Self {
            params,
            n_features,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Average of the per-tree predictions for one row.
    pub fn predict_one(&self, row: &[f64]) -> Result<f64, MlError> {
        if row.len() != self.n_features {
            return Err(MlError::inference(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(MlError::model("forest has no trees"));
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, MlError> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Check that every split references a feature inside the input width.
    pub fn validate(&self) -> Result<(), MlError> {
        if self.trees.is_empty() {
            return Err(MlError::model("forest has no trees"));
        }
        match self.trees.iter().filter_map(RegressionTree::max_feature_index).max() {
            Some(max) if max >= self.n_features => Err(MlError::model(format!(
                "tree splits on feature {max} but the forest has {} features",
                self.n_features
            ))),
            _ => Ok(()),
        }
    }
}
