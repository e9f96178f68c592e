//! Column names of the listings dataset and column type inference.

use crate::data::frame::{Cell, Frame};
use serde::{Deserialize, Serialize};

/// Column names shared by the raw and cleaned listings datasets.
pub mod columns {
    pub const MODEL_NAME: &str = "model_name";
    pub const MODEL_YEAR: &str = "model_year";
    pub const KMS_DRIVEN: &str = "kms_driven";
    pub const OWNER: &str = "owner";
    pub const LOCATION: &str = "location";
    pub const MILEAGE: &str = "mileage";
    pub const POWER: &str = "power";
    pub const PRICE: &str = "price";

    // Derived by the cleaner.
    pub const CC: &str = "cc";
    pub const BRAND: &str = "brand";
    pub const BIKE_AGE: &str = "bike_age";

    /// Optional categorical field accepted at inference time.
    pub const SEGMENT: &str = "segment";

    /// Columns the cleaner cannot work without.
    pub const CLEANER_REQUIRED: &[&str] =
        &[MODEL_NAME, MODEL_YEAR, KMS_DRIVEN, MILEAGE, POWER, PRICE];
}

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Every present value is a finite number. An all-missing column counts as numeric.
    Numeric,
    /// At least one present value is not a number.
    Categorical,
}

/// Schema definition for a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: Vec<ColumnSchema>,
}

impl SchemaDefinition {
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.dtype)
    }
}

/// Schema for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: ColumnType,
    pub nullable: bool,
}

/// Infer column type from its values.
pub fn infer_column_type<'a>(values: impl IntoIterator<Item = &'a Cell>) -> ColumnType {
    let all_numeric = values
        .into_iter()
        .filter(|v| !v.is_missing())
        .all(|v| v.to_number().is_some());
    if all_numeric {
        ColumnType::Numeric
    } else {
        ColumnType::Categorical
    }
}

/// Infer schema from a frame.
pub fn infer_schema(frame: &Frame) -> SchemaDefinition {
    let columns = frame
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| ColumnSchema {
            name: name.clone(),
            dtype: infer_column_type(frame.column_values(i)),
            nullable: frame.column_values(i).any(Cell::is_missing),
        })
        .collect();

    SchemaDefinition { columns }
}
