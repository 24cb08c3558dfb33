//! LBPH classifier backed by OpenCV's `face::LBPHFaceRecognizer`.
//!
//! Built with the `opencv` feature. The model file is whatever OpenCV's
//! `FileStorage` writes for the path's extension (`.json`, `.yml`, `.xml`),
//! so it interoperates with models trained by other OpenCV LBPH tools.

use crate::classifier::{ClassifierError, FaceClassifier};
use crate::lbph::LbphParams;
use crate::types::{NormalizedFace, Prediction, TrainingSample, FACE_SIZE};
use opencv::core::{Mat, Ptr, Vector};
use opencv::face::{
    FaceRecognizerTrait, FaceRecognizerTraitConst, LBPHFaceRecognizer,
    LBPHFaceRecognizerTraitConst,
};
use std::path::Path;

/// Recognizer threshold; the open-set decision is made by the resolver.
const NO_THRESHOLD: f64 = f64::MAX;

pub struct OpencvLbphClassifier {
    params: LbphParams,
    inner: Ptr<LBPHFaceRecognizer>,
    trained: usize,
}

fn create(params: &LbphParams) -> Result<Ptr<LBPHFaceRecognizer>, ClassifierError> {
    let int = |v: u32| {
        i32::try_from(v).map_err(|_| ClassifierError::InvalidParams(format!("{params:?}")))
    };
    Ok(LBPHFaceRecognizer::create(
        int(params.radius)?,
        int(params.neighbors)?,
        int(params.grid_x)?,
        int(params.grid_y)?,
        NO_THRESHOLD,
    )?)
}

fn to_mat(face: &NormalizedFace) -> Result<Mat, ClassifierError> {
    Ok(Mat::from_slice_rows_cols(
        face.pixels(),
        FACE_SIZE,
        FACE_SIZE,
    )?)
}

fn path_str(path: &Path) -> Result<&str, ClassifierError> {
    path.to_str().ok_or_else(|| ClassifierError::Format {
        path: path.to_path_buf(),
        message: "path is not valid UTF-8".to_string(),
    })
}

impl OpencvLbphClassifier {
    pub fn new(params: LbphParams) -> Result<Self, ClassifierError> {
        params.validate()?;
        Ok(Self {
            inner: create(&params)?,
            params,
            trained: 0,
        })
    }

    pub fn params(&self) -> &LbphParams {
        &self.params
    }

    /// Number of training histograms held.
    pub fn len(&self) -> usize {
        self.trained
    }

    pub fn is_empty(&self) -> bool {
        self.trained == 0
    }
}

impl FaceClassifier for OpencvLbphClassifier {
    fn train(&mut self, samples: &[TrainingSample]) -> Result<(), ClassifierError> {
        if samples.is_empty() {
            return Err(ClassifierError::NoTrainingData);
        }

        let mut images = Vector::<Mat>::new();
        let mut labels = Vector::<i32>::new();
        for sample in samples {
            images.push(to_mat(&sample.face)?);
            let label = i32::try_from(sample.label).map_err(|_| {
                ClassifierError::InvalidParams(format!("label {} out of range", sample.label))
            })?;
            labels.push(label);
        }

        // train() discards previous state; update() would append.
        FaceRecognizerTrait::train(&mut self.inner, &images, &labels)?;
        self.trained = samples.len();

        tracing::info!(samples = self.trained, params = ?self.params, "opencv LBPH trained");
        Ok(())
    }

    fn predict(&self, face: &NormalizedFace) -> Result<Prediction, ClassifierError> {
        if self.is_empty() {
            return Err(ClassifierError::NotTrained);
        }

        let mut label = -1i32;
        let mut distance = 0f64;
        FaceRecognizerTraitConst::predict(&self.inner, &to_mat(face)?, &mut label, &mut distance)?;

        let label = u32::try_from(label).map_err(|_| ClassifierError::NotTrained)?;
        Ok(Prediction {
            label,
            distance: distance as f32,
        })
    }

    fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        if self.is_empty() {
            return Err(ClassifierError::NotTrained);
        }
        FaceRecognizerTraitConst::write(&self.inner, path_str(path)?)?;
        tracing::debug!(path = %path.display(), "opencv LBPH model written");
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let mut inner = create(&LbphParams::default())?;
        FaceRecognizerTrait::read(&mut inner, path_str(path)?).map_err(|e| {
            ClassifierError::Format {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let unsigned = |v: i32| u32::try_from(v).unwrap_or(0);
        let params = LbphParams {
            radius: unsigned(inner.get_radius()?),
            neighbors: unsigned(inner.get_neighbors()?),
            grid_x: unsigned(inner.get_grid_x()?),
            grid_y: unsigned(inner.get_grid_y()?),
        };
        let trained = inner.get_histograms()?.len();
        if trained == 0 {
            return Err(ClassifierError::Format {
                path: path.to_path_buf(),
                message: "model holds no histograms".to_string(),
            });
        }

        Ok(Self {
            params,
            inner,
            trained,
        })
    }
}
