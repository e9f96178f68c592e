//! Indicator (one-hot) encoding of categorical columns.
//!
//! Fitting produces a [`FeatureLayout`]: numeric columns first in source order,
//! then one indicator per category for each categorical column. Categories are
//! sorted, and the first category of every column is the reference: it gets
//! no indicator and encodes as all zeros.

use crate::data::frame::Frame;
use crate::data::schema::{ColumnType, infer_column_type};
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Name of the indicator column for `category` of `column`.
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{column}_{category}")
}

/// Learned categories of one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub column: String,
    /// Category without an indicator column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Categories that have an indicator column, sorted.
    pub categories: Vec<String>,
}

impl CategoricalColumn {
    /// Whether `value` was observed while fitting (reference included).
    pub fn is_known(&self, value: &str) -> bool {
        self.reference.as_deref() == Some(value) || self.categories.iter().any(|c| c == value)
    }

    pub fn indicator_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .map(|category| indicator_name(&self.column, category))
    }
}

/// Column layout of the expanded feature matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    /// Numeric columns, passed through and later standardized.
    pub numeric: Vec<String>,
    pub categorical: Vec<CategoricalColumn>,
}

impl FeatureLayout {
    /// Ordered feature-column names.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = self.numeric.clone();
        for column in &self.categorical {
            names.extend(column.indicator_names());
        }
        names
    }

    pub fn width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    pub fn categorical_column(&self, column: &str) -> Option<&CategoricalColumn> {
        self.categorical.iter().find(|c| c.column == column)
    }

    /// Encode every row of `frame` into the layout.
    ///
    /// Missing numeric values become `NaN`; missing or unseen categories
    /// encode as the reference (all zeros).
    pub fn encode(&self, frame: &Frame) -> Result<Vec<Vec<f64>>, MlError> {
        let numeric_idx = self
            .numeric
            .iter()
            .map(|c| frame.require_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut categorical_idx = Vec::with_capacity(self.categorical.len());
        let mut offset = self.numeric.len();
        for column in &self.categorical {
            let idx = frame.require_column(&column.column)?;
            let positions: HashMap<&str, usize> = column
                .categories
                .iter()
                .enumerate()
                .map(|(i, c)| (c.as_str(), offset + i))
                .collect();
            offset += column.categories.len();
            categorical_idx.push((idx, positions));
        }

        let width = self.width();
        let matrix = frame
            .rows()
            .iter()
            .map(|row| {
                let mut encoded = vec![0.0; width];
                for (pos, &idx) in numeric_idx.iter().enumerate() {
                    encoded[pos] = row[idx].to_number().unwrap_or(f64::NAN);
                }
                for (idx, positions) in &categorical_idx {
                    if let Some(text) = row[*idx].to_text() {
                        if let Some(&pos) = positions.get(text.as_str()) {
                            encoded[pos] = 1.0;
                        }
                    }
                }
                encoded
            })
            .collect();
        Ok(matrix)
    }
}

/// Indicator encoder that drops the first category of every column.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneHotEncoder;

impl OneHotEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Learn the layout of `frame`, skipping the `exclude` columns.
    pub fn fit(&self, frame: &Frame, exclude: &[&str]) -> FeatureLayout {
        let mut layout = FeatureLayout::default();

        for (idx, name) in frame.columns().iter().enumerate() {
            if exclude.contains(&name.as_str()) {
                continue;
            }
            match infer_column_type(frame.column_values(idx)) {
                ColumnType::Numeric => layout.numeric.push(name.clone()),
                ColumnType::Categorical => {
                    let observed: BTreeSet<String> =
                        frame.column_values(idx).filter_map(|c| c.to_text()).collect();
                    let mut categories: Vec<String> = observed.into_iter().collect();
                    let reference = (!categories.is_empty()).then(|| categories.remove(0));
                    layout.categorical.push(CategoricalColumn {
                        column: name.clone(),
                        reference,
                        categories,
                    });
                }
            }
        }

        tracing::debug!(
            numeric = layout.numeric.len(),
            categorical = layout.categorical.len(),
            width = layout.width(),
            "fitted feature layout"
        );
        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frame() -> Frame {
        Frame::from_reader(
            concat!(
                "model_name,cc,brand,owner,price\n",
                "Bajaj Pulsar,150,Bajaj,first owner,60000\n",
                "Honda Shine,125,Honda,second owner,35000\n",
                "Yamaha FZ,,Yamaha,first owner,80000\n",
                "Honda Unicorn,160,Honda,,50000\n",
            )
            .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_fit_drop_first_layout() {
        let layout = OneHotEncoder::new().fit(&frame(), &["price", "model_name"]);
        assert_eq!(layout.numeric, vec!["cc"]);
        assert_eq!(
            layout.feature_names(),
            vec!["cc", "brand_Honda", "brand_Yamaha", "owner_second owner"]
        );
        let brand = layout.categorical_column("brand").unwrap();
        assert_eq!(brand.reference.as_deref(), Some("Bajaj"));
        assert!(brand.is_known("Bajaj"));
        assert!(!brand.is_known("KTM"));
    }

    #[test]
    fn test_single_category_column_has_no_indicators() {
        let f = Frame::from_reader("location,price\ndelhi,1\ndelhi,2\n".as_bytes()).unwrap();
        let layout = OneHotEncoder::new().fit(&f, &["price"]);
        let location = layout.categorical_column("location").unwrap();
        assert_eq!(location.reference.as_deref(), Some("delhi"));
        assert!(location.categories.is_empty());
        assert_eq!(layout.width(), 0);
        assert_eq!(layout.encode(&f).unwrap(), vec![Vec::<f64>::new(); 2]);
    }

    #[test]
    fn test_encode_rows() {
        let f = frame();
        let layout = OneHotEncoder::new().fit(&f, &["price", "model_name"]);
        let matrix = layout.encode(&f).unwrap();

        assert_eq!(matrix[0], vec![150.0, 0.0, 0.0, 0.0]);
        assert_eq!(matrix[1], vec![125.0, 1.0, 0.0, 1.0]);
        assert!(matrix[2][0].is_nan());
        assert_eq!(&matrix[2][1..], &[0.0, 1.0, 0.0]);
        // Missing owner encodes as the reference category.
        assert_eq!(&matrix[3][1..], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_requires_layout_columns() {
        let layout = OneHotEncoder::new().fit(&frame(), &[]);
        let other = Frame::from_reader("cc\n1\n".as_bytes()).unwrap();
        assert!(layout.encode(&other).is_err());
    }
}
