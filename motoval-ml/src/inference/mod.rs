//! Inference: loading a persisted bundle, scoring listings and finding similar ones.

pub mod bundle;
pub mod predictor;
pub mod similar;

pub use bundle::{ArtifactEntry, BundleManifest, ModelBundle};
pub use predictor::{BikeQuery, FeatureInput, Prediction, Predictor, UnseenCategory};
pub use similar::{SimilarListing, SimilarQuery, find_similar};
