//! Regression metrics.

use serde::{Deserialize, Serialize};

/// Held-out evaluation of a regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Coefficient of determination; `None` when the targets have zero variance.
    pub r_squared: Option<f64>,
    pub n_samples: usize,
}

impl RegressionMetrics {
    /// Compute metrics, or `None` for an empty evaluation set.
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Option<Self> {
        let n = y_true.len().min(y_pred.len());
        if n == 0 {
            return None;
        }
        let nf = n as f64;
        let pairs = || y_true.iter().zip(y_pred).take(n);

        let sse: f64 = pairs().map(|(t, p)| (t - p).powi(2)).sum();
        let mae = pairs().map(|(t, p)| (t - p).abs()).sum::<f64>() / nf;
        let mean = y_true[..n].iter().sum::<f64>() / nf;
        let sst: f64 = y_true[..n].iter().map(|t| (t - mean).powi(2)).sum();

        let mse = sse / nf;
        Some(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r_squared: (sst > 0.0).then(|| 1.0 - sse / sst),
            n_samples: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let m = RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r_squared, Some(1.0));
    }

    #[test]
    fn test_known_values() {
        let m = RegressionMetrics::compute(&[3.0, -0.5, 2.0, 7.0], &[2.5, 0.0, 2.0, 8.0]).unwrap();
        assert!((m.mse - 0.375).abs() < 1e-12);
        assert!((m.mae - 0.5).abs() < 1e-12);
        assert!((m.r_squared.unwrap() - 0.948_608_137_044_967_9).abs() < 1e-9);
        assert_eq!(m.n_samples, 4);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(RegressionMetrics::compute(&[], &[]).is_none());
        let m = RegressionMetrics::compute(&[5.0], &[4.0]).unwrap();
        assert_eq!(m.mse, 1.0);
        assert_eq!(m.r_squared, None);
    }
}
