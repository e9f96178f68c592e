//! Trainer: cleaned frame in, persisted model bundle out.

use crate::algorithms::{ForestParams, RandomForestRegressor, TreeParams};
use crate::data::frame::Frame;
use crate::data::schema::{ColumnType, columns, infer_schema};
use crate::error::MlError;
use crate::features::{FeatureLayout, OneHotEncoder, StandardScaler};
use crate::inference::bundle::{BundleManifest, ModelBundle};
use crate::training::metrics::RegressionMetrics;
use crate::training::split::train_test_split;
use motoval_core::TrainingConfig;
use std::path::Path;

/// Result of one training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    /// Held-out metrics; `None` when every row was used for training.
    pub metrics: Option<RegressionMetrics>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub layout: FeatureLayout,
}

/// Fits the encoder, scaler and forest on a cleaned dataset.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.config.n_estimators,
            seed: self.config.seed,
            bootstrap: true,
            tree: TreeParams {
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                min_samples_leaf: self.config.min_samples_leaf,
            },
        }
    }

    /// Train on a cleaned frame. Nothing is written to disk.
    pub fn train(&self, frame: &Frame) -> Result<TrainingOutcome, MlError> {
        if frame.row_count() == 0 {
            return Err(MlError::training("cleaned dataset has no rows"));
        }
        let price_idx = frame.require_column(columns::PRICE)?;
        let schema = infer_schema(frame);
        if schema.column_type(columns::PRICE) == Some(ColumnType::Categorical) {
            return Err(MlError::training("price column is not numeric"));
        }
        let with_gaps: Vec<&str> = schema
            .columns
            .iter()
            .filter(|c| c.nullable && c.name != columns::PRICE)
            .map(|c| c.name.as_str())
            .collect();
        if !with_gaps.is_empty() {
            tracing::debug!(columns = ?with_gaps, "feature columns with missing values");
        }
        let targets = frame
            .column_values(price_idx)
            .enumerate()
            .map(|(row, cell)| {
                cell.to_number().ok_or_else(|| {
                    MlError::training(format!("row {row} has no numeric price"))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        let layout = OneHotEncoder::new().fit(frame, &[columns::PRICE, columns::MODEL_NAME]);
        let feature_names = layout.feature_names();
        let mut matrix = layout.encode(frame)?;

        let scaler = StandardScaler::fit(&layout.numeric, &feature_names, &matrix)?;
        scaler.transform_in_place(&feature_names, &mut matrix)?;
        let mut filled = 0usize;
        for value in matrix.iter_mut().flatten() {
            if value.is_nan() {
                *value = 0.0;
                filled += 1;
            }
        }
        if filled > 0 {
            tracing::warn!(cells = filled, "missing numeric features filled with the column mean");
        }

        let split = train_test_split(frame.row_count(), self.config.test_fraction, self.config.seed)?;
        if split.test.is_empty() {
            tracing::warn!(
                rows = frame.row_count(),
                "too few rows to hold out a test set; training on all rows without evaluation"
            );
        }
        let gather = |indices: &[usize]| -> (Vec<Vec<f64>>, Vec<f64>) {
            indices
                .iter()
                .map(|&i| (matrix[i].clone(), targets[i]))
                .unzip()
        };
        let (x_train, y_train) = gather(&split.train);
        let (x_test, y_test) = gather(&split.test);

        let params = self.forest_params();
        let regressor = RandomForestRegressor::fit(params, &x_train, &y_train)?;

        let metrics = if x_test.is_empty() {
            None
        } else {
            let predictions = regressor.predict(&x_test)?;
            RegressionMetrics::compute(&y_test, &predictions)
        };

        match &metrics {
            Some(m) => tracing::info!(
                mse = m.mse,
                rmse = m.rmse,
                mae = m.mae,
                r_squared = ?m.r_squared,
                test_rows = m.n_samples,
                "evaluated model on held-out rows"
            ),
            None => tracing::info!("model trained without evaluation"),
        }

        let manifest = BundleManifest {
            run_id: uuid::Uuid::new_v4().to_string(),
            trained_at: chrono::Utc::now(),
            seed: params.seed,
            n_estimators: params.n_estimators,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            metrics: metrics.clone(),
            categorical: layout.categorical.clone(),
            artifacts: Vec::new(),
        };
        let bundle = ModelBundle::new(regressor, scaler, feature_names, manifest)?;

        Ok(TrainingOutcome {
            bundle,
            metrics,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            layout,
        })
    }

    /// Load the cleaned CSV, train, and save the bundle into `model_dir`.
    pub fn train_file(&self, cleaned: &Path, model_dir: &Path) -> Result<TrainingOutcome, MlError> {
        let frame = Frame::read_csv_typed(cleaned)?;
        tracing::info!(
            path = %cleaned.display(),
            rows = frame.row_count(),
            trees = self.config.n_estimators,
            seed = self.config.seed,
            "training price model"
        );
        let mut outcome = self.train(&frame)?;
        outcome.bundle.save(model_dir)?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(n_estimators: usize) -> TrainingConfig {
        TrainingConfig {
            n_estimators,
            ..Default::default()
        }
    }

    fn frame(rows: usize) -> Frame {
        let mut csv = String::from("model_name,model_year,kms_driven,owner,mileage,price,cc,brand,bike_age\n");
        for i in 0..rows {
            let brand = ["Bajaj", "Honda", "Yamaha"][i % 3];
            let year = 2010 + (i % 12);
            let cc = 100 + 25 * (i % 6);
            let price = 20000 + 3000 * (year - 2010) + 200 * cc;
            csv.push_str(&format!(
                "{brand} Model {cc}cc,{year},{},first owner,{},{price},{cc},{brand},{}\n",
                1000 * (i + 1),
                40 + i % 9,
                2023 - year
            ));
        }
        let mut frame = Frame::from_reader(csv.as_bytes()).unwrap();
        frame.infer_types();
        frame
    }

    #[test]
    fn test_train_produces_consistent_bundle() {
        let outcome = Trainer::new(config(20)).train(&frame(30)).unwrap();
        assert_eq!(outcome.train_rows, 24);
        assert_eq!(outcome.test_rows, 6);
        assert_eq!(
            outcome.bundle.feature_names,
            vec![
                "model_year",
                "kms_driven",
                "mileage",
                "cc",
                "bike_age",
                "brand_Honda",
                "brand_Yamaha"
            ]
        );
        // A single-valued categorical column contributes no indicators.
        assert!(outcome.layout.categorical_column("owner").unwrap().categories.is_empty());
        assert_eq!(outcome.bundle.regressor.n_trees(), 20);

        let metrics = outcome.metrics.unwrap();
        assert_eq!(metrics.n_samples, 6);
        assert!(metrics.mse.is_finite());
    }

    #[test]
    fn test_training_is_reproducible() {
        let data = frame(25);
        let a = Trainer::new(config(10)).train(&data).unwrap();
        let b = Trainer::new(config(10)).train(&data).unwrap();
        assert_eq!(a.bundle.regressor, b.bundle.regressor);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_single_row_trains_without_evaluation() {
        let outcome = Trainer::new(config(5)).train(&frame(1)).unwrap();
        assert_eq!(outcome.train_rows, 1);
        assert_eq!(outcome.test_rows, 0);
        assert!(outcome.metrics.is_none());
    }

    #[test]
    fn test_missing_price_fails() {
        let mut data = Frame::from_reader("model_name,cc,price\na,150,\nb,125,100\n".as_bytes()).unwrap();
        data.infer_types();
        assert!(matches!(
            Trainer::new(config(3)).train(&data),
            Err(MlError::Training(_))
        ));
        assert!(Trainer::default().train(&Frame::new(vec!["price".into()])).is_err());

        let text_price = Frame::from_reader("model_name,price\na,cheap\n".as_bytes()).unwrap();
        assert!(Trainer::new(config(3)).train(&text_price).is_err());
    }
}
