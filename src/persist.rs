use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::forest::RandomForest;

pub const DEFAULT_MODEL_FILE: &str = "football_prediction_model.json";
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub generated_at: String,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub train_samples: usize,
    #[serde(default)]
    pub test_samples: usize,
    #[serde(default)]
    pub train_accuracy: f64,
    #[serde(default)]
    pub test_accuracy: f64,
    pub model: RandomForest,
}

impl ModelArtifact {
    pub fn new(model: RandomForest, feature_names: Vec<String>) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            feature_names,
            train_samples: 0,
            test_samples: 0,
            train_accuracy: 0.0,
            test_accuracy: 0.0,
            model,
        }
    }
}

pub fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_FILE)
}

/// Writes to a sibling `.tmp` file first and renames it over `path`.
pub fn save_model(path: &Path, artifact: &ModelArtifact) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }

    let json = serde_json::to_string(artifact).context("serialize model artifact")?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

pub fn load_model(path: &Path) -> Result<ModelArtifact> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let artifact: ModelArtifact = serde_json::from_str(&raw)
        .with_context(|| format!("parse model artifact {}", path.display()))?;
    if artifact.version != ARTIFACT_VERSION {
        return Err(anyhow!(
            "unsupported model artifact version {} (expected {})",
            artifact.version,
            ARTIFACT_VERSION
        ));
    }
    if artifact.feature_names.len() != artifact.model.n_features() {
        return Err(anyhow!(
            "artifact lists {} features but the model expects {}",
            artifact.feature_names.len(),
            artifact.model.n_features()
        ));
    }
    Ok(artifact)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
