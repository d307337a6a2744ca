//! Versioned on-disk model artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::feature_schema::{FEATURE_NAMES, FEATURE_SCHEMA_VERSION, FeatureRow};
use crate::gbt::GradientBoostedTrees;
use crate::label_encoder::LabelEncoder;
use crate::metrics::Prob3;
use crate::outcome_model::{OutcomeModel, decode_probs};

const ARTIFACT_FILE: &str = "outcome_model.json";

/// Everything needed to score a feature row: the model, its class
/// vocabulary and the feature layout it was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub schema_version: u32,
    pub feature_names: Vec<String>,
    pub encoder: LabelEncoder,
    pub model: GradientBoostedTrees,
    pub trained_at: String,
    pub training_rows: usize,
    pub data_fingerprint: String,
}

impl ModelArtifacts {
    pub fn predict_probs(&self, row: &FeatureRow) -> Prob3 {
        let probs = self.model.predict_proba(&row.values);
        decode_probs(&probs, &self.encoder)
    }

    fn check_schema(&self) -> Result<()> {
        if self.schema_version != FEATURE_SCHEMA_VERSION {
            bail!(
                "model was trained on feature schema v{}, current schema is v{}",
                self.schema_version,
                FEATURE_SCHEMA_VERSION
            );
        }
        let same = self.feature_names.len() == FEATURE_NAMES.len()
            && self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES.iter())
                .all(|(a, b)| a == b);
        if !same {
            bail!("model feature columns do not match the current feature schema");
        }
        if self.model.n_features() != FEATURE_NAMES.len() {
            bail!(
                "model expects {} input columns, feature schema has {}",
                self.model.n_features(),
                FEATURE_NAMES.len()
            );
        }
        Ok(())
    }
}

pub fn artifact_path(models_dir: &Path) -> PathBuf {
    models_dir.join(ARTIFACT_FILE)
}

pub fn save_artifacts(models_dir: &Path, artifacts: &ModelArtifacts) -> Result<PathBuf> {
    fs::create_dir_all(models_dir)
        .with_context(|| format!("create models dir {}", models_dir.display()))?;
    let path = artifact_path(models_dir);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(artifacts).context("serialize model artifacts")?;
    fs::write(&tmp, json).context("write model artifacts")?;
    fs::rename(&tmp, &path).context("swap model artifacts")?;
    info!(path = %path.display(), rows = artifacts.training_rows, "saved model artifacts");
    Ok(path)
}

/// `Ok(None)` when no model has been saved yet. A file written against a
/// different feature schema is an error.
pub fn load_artifacts(models_dir: &Path) -> Result<Option<ModelArtifacts>> {
    let path = artifact_path(models_dir);
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let artifacts: ModelArtifacts = serde_json::from_str(&raw)
        .with_context(|| format!("invalid model artifacts in {}", path.display()))?;
    artifacts
        .check_schema()
        .with_context(|| format!("incompatible model artifacts in {}", path.display()))?;
    Ok(Some(artifacts))
}
