//! # motoval-ml — cleaning, training and inference for used-motorcycle prices
//!
//! The pipeline runs in two batch stages and one read-only consumer:
//! 1. **Cleaning**: raw listings CSV to a cleaned CSV with numeric, imputed fields
//! 2. **Training**: indicator encoding, standardization and a random forest, persisted as a bundle
//! 3. **Inference**: load the bundle once, score listings, look up similar listings

// Foundation
pub mod error;

// Data & features
pub mod data;
pub mod features;

// Models
pub mod algorithms;
pub mod training;

// Serving
pub mod inference;

// Re-exports
pub use data::{Cell, Cleaner, CleaningReport, Frame};
pub use error::MlError;
pub use inference::{
    BikeQuery, FeatureInput, ModelBundle, Prediction, Predictor, SimilarListing, SimilarQuery,
    find_similar,
};
pub use training::{RegressionMetrics, Trainer, TrainingOutcome};
