//! Persisted model + label space pair.
//!
//! The two artifacts are written and loaded together but are separate files.
//! Nothing here can tell whether a label file belongs to the model next to
//! it: swapping one without the other silently produces wrong names.

use crate::classifier::{ClassifierError, FaceClassifier};
use crate::labels::LabelSpace;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("recognizer model not found: {0}")]
    ModelNotFound(PathBuf),
    #[error("labels file not found: {0}")]
    LabelsNotFound(PathBuf),
    #[error("failed to load recognizer model: {0}")]
    ModelLoad(#[source] ClassifierError),
    #[error("failed to read labels file {path}: {source}")]
    LabelsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse labels file {path}: {source}")]
    LabelsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A classifier together with the label space it was trained with.
#[derive(Debug)]
pub struct TrainedModel<C> {
    pub classifier: C,
    pub labels: LabelSpace,
}

/// Load a model and its label space.
///
/// Both paths are checked for existence first so the error names the
/// missing artifact.
pub fn load<C: FaceClassifier>(
    model_path: &Path,
    labels_path: &Path,
) -> Result<TrainedModel<C>, StoreError> {
    if !model_path.exists() {
        return Err(StoreError::ModelNotFound(model_path.to_path_buf()));
    }
    if !labels_path.exists() {
        return Err(StoreError::LabelsNotFound(labels_path.to_path_buf()));
    }

    let classifier = C::load(model_path).map_err(StoreError::ModelLoad)?;
    let labels = load_labels(labels_path)?;

    tracing::info!(
        model = %model_path.display(),
        labels = %labels_path.display(),
        people = labels.len(),
        "loaded model and labels"
    );

    Ok(TrainedModel { classifier, labels })
}

/// Read a label space file; `id_to_name` keys are parsed as integers.
pub fn load_labels(path: &Path) -> Result<LabelSpace, StoreError> {
    let json = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::LabelsNotFound(path.to_path_buf())
        } else {
            StoreError::LabelsRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let labels = LabelSpace::from_json(&json).map_err(|source| StoreError::LabelsParse {
        path: path.to_path_buf(),
        source,
    })?;

    if !labels.is_consistent() {
        tracing::warn!(path = %path.display(), "name_to_id and id_to_name disagree");
    }

    Ok(labels)
}

/// Write the model, then the labels. Not atomic as a pair.
pub fn save<C: FaceClassifier>(
    classifier: &C,
    labels: &LabelSpace,
    model_path: &Path,
    labels_path: &Path,
) -> Result<(), StoreError> {
    classifier
        .save(model_path)
        .map_err(|e| StoreError::Persistence {
            path: model_path.to_path_buf(),
            source: Box::new(e),
        })?;
    save_labels(labels, labels_path)?;

    tracing::info!(
        model = %model_path.display(),
        labels = %labels_path.display(),
        "saved model and labels"
    );
    Ok(())
}

pub fn save_labels(labels: &LabelSpace, path: &Path) -> Result<(), StoreError> {
    let persistence = |source: Box<dyn std::error::Error + Send + Sync>| StoreError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    let json = labels.to_json().map_err(|e| persistence(Box::new(e)))?;
    fs::write(path, json).map_err(|e| persistence(Box::new(e)))
}
