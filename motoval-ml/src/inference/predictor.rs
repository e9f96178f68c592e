//! Single-listing price prediction against a loaded [`ModelBundle`].

use crate::data::schema::columns;
use crate::error::MlError;
use crate::features::indicator_name;
use crate::inference::bundle::ModelBundle;
use crate::inference::similar::SimilarQuery;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Raw feature values keyed by column name.
///
/// Numeric fields that are not supplied encode as `0.0` before scaling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureInput {
    pub numeric: BTreeMap<String, f64>,
    pub categorical: BTreeMap<String, String>,
}

impl FeatureInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_numeric(mut self, column: impl Into<String>, value: f64) -> Self {
        self.numeric.insert(column.into(), value);
        self
    }

    pub fn with_category(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.categorical.insert(column.into(), value.into());
        self
    }
}

/// A listing as entered by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BikeQuery {
    pub brand: String,
    pub owner: String,
    pub location: String,
    pub model_year: i32,
    pub kms_driven: f64,
    pub mileage: f64,
    pub power: f64,
    pub cc: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

impl BikeQuery {
    /// Feature input with `bike_age` derived from `reference_year`.
    pub fn to_feature_input(&self, reference_year: i32) -> FeatureInput {
        let mut input = FeatureInput::new()
            .with_numeric(columns::MODEL_YEAR, f64::from(self.model_year))
            .with_numeric(columns::KMS_DRIVEN, self.kms_driven)
            .with_numeric(columns::MILEAGE, self.mileage)
            .with_numeric(columns::POWER, self.power)
            .with_numeric(columns::CC, self.cc)
            .with_numeric(
                columns::BIKE_AGE,
                f64::from(reference_year) - f64::from(self.model_year),
            )
            .with_category(columns::BRAND, &self.brand)
            .with_category(columns::OWNER, &self.owner)
            .with_category(columns::LOCATION, &self.location);
        if let Some(segment) = &self.segment {
            input = input.with_category(columns::SEGMENT, segment);
        }
        input
    }

    pub fn similar_query(&self) -> SimilarQuery {
        SimilarQuery {
            brand: self.brand.clone(),
            model_year: f64::from(self.model_year),
            kms_driven: self.kms_driven,
            cc: self.cc,
        }
    }
}

/// A categorical value the model never saw; it was scored as the reference category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnseenCategory {
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub price: f64,
    pub unseen_categories: Vec<UnseenCategory>,
    /// Supplied fields the model has no feature for.
    pub ignored_fields: Vec<String>,
}

/// Encodes inputs into the bundle's feature space and scores them.
pub struct Predictor<'a> {
    bundle: &'a ModelBundle,
    index: HashMap<&'a str, usize>,
    scaler_positions: Vec<usize>,
}

impl<'a> Predictor<'a> {
    pub fn new(bundle: &'a ModelBundle) -> Result<Self, MlError> {
        let index = bundle
            .feature_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let scaler_positions = bundle.scaler.positions(&bundle.feature_names)?;
        Ok(Self {
            bundle,
            index,
            scaler_positions,
        })
    }

    /// Build the scaled feature row for `input`.
    pub fn encode(&self, input: &FeatureInput) -> Result<(Vec<f64>, Prediction), MlError> {
        let mut row = vec![0.0; self.bundle.feature_names.len()];
        let mut report = Prediction {
            price: 0.0,
            unseen_categories: Vec::new(),
            ignored_fields: Vec::new(),
        };

        for (column, &value) in &input.numeric {
            if !value.is_finite() {
                return Err(MlError::invalid_input(format!(
                    "{column} must be a finite number, got {value}"
                )));
            }
            match self.index.get(column.as_str()) {
                Some(&pos) => row[pos] = value,
                None => report.ignored_fields.push(column.clone()),
            }
        }

        for (column, value) in &input.categorical {
            if let Some(&pos) = self.index.get(indicator_name(column, value).as_str()) {
                row[pos] = 1.0;
                continue;
            }
            match self.bundle.categorical_column(column) {
                Some(learned) if learned.reference.as_deref() == Some(value.as_str()) => {}
                Some(_) => self.unseen(&mut report, column, value),
                None if self.has_indicators_for(column) => self.unseen(&mut report, column, value),
                None => report.ignored_fields.push(column.clone()),
            }
        }

        for (i, &pos) in self.scaler_positions.iter().enumerate() {
            row[pos] = (row[pos] - self.bundle.scaler.mean[i]) / self.bundle.scaler.scale[i];
        }

        Ok((row, report))
    }

    pub fn predict(&self, input: &FeatureInput) -> Result<Prediction, MlError> {
        let (row, mut prediction) = self.encode(input)?;
        prediction.price = self.bundle.regressor.predict_one(&row)?;
        tracing::debug!(
            price = prediction.price,
            unseen = prediction.unseen_categories.len(),
            ignored = prediction.ignored_fields.len(),
            "scored listing"
        );
        Ok(prediction)
    }

    fn has_indicators_for(&self, column: &str) -> bool {
        let prefix = format!("{column}_");
        self.bundle
            .feature_names
            .iter()
            .any(|name| name.starts_with(&prefix) && !self.bundle.scaler.columns.contains(name))
    }

    fn unseen(&self, report: &mut Prediction, column: &str, value: &str) {
        tracing::warn!(
            column,
            value,
            "category not seen in training; scoring as the reference category"
        );
        report.unseen_categories.push(UnseenCategory {
            column: column.to_string(),
            value: value.to_string(),
        });
    }
}

impl ModelBundle {
    /// Score one listing.
    pub fn predict(&self, input: &FeatureInput) -> Result<Prediction, MlError> {
        Predictor::new(self)?.predict(input)
    }
}
