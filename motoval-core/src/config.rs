//! Configuration system for motoval.
//!
//! Uses `figment` for layered configuration: defaults -> config files -> environment -> CLI args.
//! Configuration is loaded from the user config directory (`config.toml`) and/or
//! `.motoval/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the cleaning, training and inference pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotovalConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub cleaning: CleaningConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl MotovalConfig {
    /// Resolve a configured path against the workspace directory.
    ///
    /// Absolute paths are returned unchanged.
    pub fn resolve(workspace: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            workspace.join(path)
        }
    }
}

/// Dataset locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Raw listings CSV consumed by the cleaner.
    #[serde(default = "default_raw_path")]
    pub raw_path: PathBuf,
    /// Cleaned CSV produced by the cleaner and consumed by the trainer.
    #[serde(default = "default_cleaned_path")]
    pub cleaned_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_path: default_raw_path(),
            cleaned_path: default_cleaned_path(),
        }
    }
}

fn default_raw_path() -> PathBuf {
    PathBuf::from("data/bikes.csv")
}

fn default_cleaned_path() -> PathBuf {
    PathBuf::from("data/cleaned_bikes.csv")
}

/// Cleaner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Year that `bike_age` is measured against. Fixed, not the wall-clock year.
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            reference_year: default_reference_year(),
        }
    }
}

fn default_reference_year() -> i32 {
    2023
}

/// Trainer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed shared by the train/test split and the forest.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction of rows held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Number of trees in the forest.
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    /// Maximum tree depth (unbounded when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            test_fraction: default_test_fraction(),
            n_estimators: default_n_estimators(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_n_estimators() -> usize {
    200
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

/// Model artifact settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Directory holding the model bundle.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
        }
    }
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

/// Inference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Number of listings returned by the similar-listing lookup.
    #[serde(default = "default_similar_top_k")]
    pub similar_top_k: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            similar_top_k: default_similar_top_k(),
        }
    }
}

fn default_similar_top_k() -> usize {
    5
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("dev", "motoval", "motoval")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `MOTOVAL_`, sections split on `__`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.motoval/config.toml`)
/// 4. User config (`~/.config/motoval/config.toml`)
/// 5. Built-in defaults
///
/// CLI flags are applied by the caller on top of the returned value.
pub fn load_config(
    workspace: Option<&Path>,
    explicit: Option<&Path>,
) -> Result<MotovalConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(MotovalConfig::default()));

    if let Some(dirs) = project_dirs() {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".motoval").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        figment = figment.merge(Toml::file(path));
    }

    // MOTOVAL_TRAINING__SEED, MOTOVAL_MODEL__MODEL_DIR, etc.
    figment = figment.merge(Env::prefixed("MOTOVAL_").split("__"));

    figment.extract().map_err(Box::new)
}
