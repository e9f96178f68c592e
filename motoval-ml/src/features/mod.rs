//! Feature engineering — indicator encoding and standardization.

pub mod encoding;
pub mod scaling;

pub use encoding::{CategoricalColumn, FeatureLayout, OneHotEncoder, indicator_name};
pub use scaling::StandardScaler;
