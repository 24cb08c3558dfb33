//! Appearance-based classifier capability.
//!
//! The rest of the crate only needs train / predict / save / load; the
//! concrete algorithm (see [`crate::lbph`], or `opencv_lbph` with the
//! `opencv` feature) sits behind this trait.

use crate::types::{NormalizedFace, Prediction, TrainingSample};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("classifier has not been trained")]
    NotTrained,
    #[error("no training samples")]
    NoTrainingData,
    #[error("invalid classifier parameters: {0}")]
    InvalidParams(String),
    #[error("model geometry mismatch: {0}")]
    GeometryMismatch(String),
    #[error("model format error in {path}: {message}")]
    Format { path: PathBuf, message: String },
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "opencv")]
    #[error("opencv: {0}")]
    OpenCv(#[from] opencv::Error),
}

pub trait FaceClassifier: Sized {
    /// Train from scratch on the full sample set, discarding any previous state.
    fn train(&mut self, samples: &[TrainingSample]) -> Result<(), ClassifierError>;

    /// Best-matching label and its distance (0 = perfect match).
    fn predict(&self, face: &NormalizedFace) -> Result<Prediction, ClassifierError>;

    fn save(&self, path: &Path) -> Result<(), ClassifierError>;

    fn load(path: &Path) -> Result<Self, ClassifierError>;
}
