//! Standard scaler (z-score normalization) over named feature columns.
//!
//! `z = (x - mean) / scale`, where `scale` is the population standard
//! deviation. Columns are addressed by name so the scaler can be applied to
//! any matrix whose feature-name list contains its columns.

use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Fitted standardization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Columns the scaler was fitted on, in fit order.
    pub columns: Vec<String>,
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    /// Standard deviation, or 1.0 for constant columns.
    pub scale: Vec<f64>,
    /// Non-missing values seen per column.
    pub n_samples_seen: Vec<usize>,
}

impl StandardScaler {
    /// Fit on `columns` of `matrix`, whose column order is `feature_names`.
    ///
    /// `NaN` values are ignored. A column with no observations gets mean 0 and scale 1.
    pub fn fit(
        columns: &[String],
        feature_names: &[String],
        matrix: &[Vec<f64>],
    ) -> Result<Self, MlError> {
        if matrix.is_empty() {
            return Err(MlError::training("cannot fit scaler on empty data"));
        }
        let positions = resolve(columns, feature_names)?;

        let mut mean = Vec::with_capacity(columns.len());
        let mut variance = Vec::with_capacity(columns.len());
        let mut scale = Vec::with_capacity(columns.len());
        let mut n_samples_seen = Vec::with_capacity(columns.len());

        for &pos in &positions {
            let values: Vec<f64> = matrix
                .iter()
                .map(|row| row[pos])
                .filter(|v| !v.is_nan())
                .collect();
            let n = values.len();
            let (m, var) = if n == 0 {
                (0.0, 0.0)
            } else {
                let m = values.iter().sum::<f64>() / n as f64;
                let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
                (m, var)
            };
            let s = var.sqrt();
            mean.push(m);
            variance.push(var);
            scale.push(if s == 0.0 { 1.0 } else { s });
            n_samples_seen.push(n);
        }

        Ok(Self {
            columns: columns.to_vec(),
            mean,
            variance,
            scale,
            n_samples_seen,
        })
    }

    /// Positions of the scaler's columns within `feature_names`.
    pub fn positions(&self, feature_names: &[String]) -> Result<Vec<usize>, MlError> {
        resolve(&self.columns, feature_names)
    }

    /// Standardize the scaler's columns of every row in place.
    pub fn transform_in_place(
        &self,
        feature_names: &[String],
        matrix: &mut [Vec<f64>],
    ) -> Result<(), MlError> {
        let positions = self.positions(feature_names)?;
        for row in matrix.iter_mut() {
            self.transform_row(&positions, row);
        }
        Ok(())
    }

    /// Standardize one row given pre-resolved column positions.
    pub fn transform_row(&self, positions: &[usize], row: &mut [f64]) {
        for (i, &pos) in positions.iter().enumerate() {
            row[pos] = (row[pos] - self.mean[i]) / self.scale[i];
        }
    }
}

fn resolve(columns: &[String], feature_names: &[String]) -> Result<Vec<usize>, MlError> {
    columns
        .iter()
        .map(|c| {
            feature_names
                .iter()
                .position(|f| f == c)
                .ok_or_else(|| MlError::model(format!("scaler column '{c}' not in feature list")))
        })
        .collect()
}
