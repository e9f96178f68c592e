//! # motoval-core
//!
//! Shared foundation for the motoval workspace: layered configuration and
//! the atomic persistence helpers used when writing datasets and model artifacts.

pub mod config;
pub mod persistence;

pub use config::{
    CleaningConfig, DataConfig, InferenceConfig, ModelConfig, MotovalConfig, TrainingConfig,
    load_config,
};
