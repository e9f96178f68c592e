//! Model bundle: regressor, scaler and feature names, plus a hashed manifest.
//!
//! Each artifact is written atomically and its SHA-256 is recorded in
//! `manifest.json`, which is written last. Loading re-hashes every artifact
//! and refuses a bundle whose files disagree with the manifest or with each
//! other.

use crate::algorithms::RandomForestRegressor;
use crate::error::MlError;
use crate::features::{CategoricalColumn, StandardScaler};
use crate::training::metrics::RegressionMetrics;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use motoval_core::persistence::{self, FileDigest};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Hash record for one persisted artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub file: String,
    #[serde(flatten)]
    pub digest: FileDigest,
}

/// Provenance of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub n_estimators: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RegressionMetrics>,
    /// Categorical columns seen in training, with their reference categories.
    #[serde(default)]
    pub categorical: Vec<CategoricalColumn>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactEntry>,
}

impl BundleManifest {
    pub fn artifact(&self, file: &str) -> Option<&ArtifactEntry> {
        self.artifacts.iter().find(|a| a.file == file)
    }
}

/// Everything needed to score a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub regressor: RandomForestRegressor,
    pub scaler: StandardScaler,
    pub feature_names: Vec<String>,
    pub manifest: BundleManifest,
}

impl ModelBundle {
    pub fn new(
        regressor: RandomForestRegressor,
        scaler: StandardScaler,
        feature_names: Vec<String>,
        manifest: BundleManifest,
    ) -> Result<Self, MlError> {
        let bundle = Self {
            regressor,
            scaler,
            feature_names,
            manifest,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Cross-artifact consistency checks.
    pub fn validate(&self) -> Result<(), MlError> {
        self.scaler.positions(&self.feature_names)?;
        if self.regressor.n_features() != self.feature_names.len() {
            return Err(MlError::model(format!(
                "regressor expects {} features but the feature list has {}",
                self.regressor.n_features(),
                self.feature_names.len()
            )));
        }
        for column in &self.manifest.categorical {
            if let Some(name) = column
                .indicator_names()
                .find(|name| !self.feature_names.contains(name))
            {
                return Err(MlError::model(format!(
                    "manifest indicator '{name}' not in feature list"
                )));
            }
        }
        self.regressor.validate()
    }

    /// Categorical column learned in training, if any.
    pub fn categorical_column(&self, column: &str) -> Option<&CategoricalColumn> {
        self.manifest.categorical.iter().find(|c| c.column == column)
    }

    /// Persist all artifacts into `dir`, replacing any previous bundle.
    ///
    /// The manifest's artifact hashes are refreshed as part of the save.
    pub fn save(&mut self, dir: &Path) -> Result<(), MlError> {
        self.validate()?;
        let artifacts = vec![
            write_artifact(dir, MODEL_FILE, &self.regressor)?,
            write_artifact(dir, SCALER_FILE, &self.scaler)?,
            write_artifact(dir, FEATURE_NAMES_FILE, &self.feature_names)?,
        ];
        self.manifest.artifacts = artifacts;
        persistence::write_json(&dir.join(MANIFEST_FILE), &self.manifest)?;

        tracing::info!(
            dir = %dir.display(),
            run_id = %self.manifest.run_id,
            features = self.feature_names.len(),
            "saved model bundle"
        );
        Ok(())
    }

    /// Load and verify a bundle written by [`ModelBundle::save`].
    pub fn load(dir: &Path) -> Result<Self, MlError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: BundleManifest = persistence::read_json(&manifest_path)?
            .ok_or_else(|| {
                MlError::not_found(format!("no model bundle at {}", dir.display()))
            })?;

        let regressor: RandomForestRegressor = read_artifact(dir, MODEL_FILE, &manifest)?;
        let scaler: StandardScaler = read_artifact(dir, SCALER_FILE, &manifest)?;
        let feature_names: Vec<String> = read_artifact(dir, FEATURE_NAMES_FILE, &manifest)?;

        let bundle = Self::new(regressor, scaler, feature_names, manifest)?;
        tracing::debug!(
            dir = %dir.display(),
            run_id = %bundle.manifest.run_id,
            trees = bundle.regressor.n_trees(),
            "loaded model bundle"
        );
        Ok(bundle)
    }
}

fn write_artifact<T: Serialize>(dir: &Path, file: &str, value: &T) -> Result<ArtifactEntry, MlError> {
    let digest = persistence::write_json(&dir.join(file), value)?;
    Ok(ArtifactEntry {
        file: file.to_string(),
        digest,
    })
}

fn read_artifact<T: DeserializeOwned>(
    dir: &Path,
    file: &str,
    manifest: &BundleManifest,
) -> Result<T, MlError> {
    let entry = manifest
        .artifact(file)
        .ok_or_else(|| MlError::model(format!("manifest has no entry for {file}")))?;
    let path = dir.join(file);
    let bytes = persistence::read_verified(&path, &entry.digest).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            MlError::not_found(format!("missing artifact {}", path.display()))
        }
        std::io::ErrorKind::InvalidData => MlError::model(e.to_string()),
        _ => MlError::Io(e),
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}
