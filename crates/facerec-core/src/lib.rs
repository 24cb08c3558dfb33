//! facerec-core: face dataset indexing, LBPH training and open-set recognition.
//!
//! Builds a name↔id label space from a one-folder-per-person dataset, trains
//! an LBPH classifier on 200×200 grayscale crops, and resolves per-frame
//! predictions to a known name or "Unknown" against a confidence threshold.
//! Face regions come from an SCRFD detector running on ONNX Runtime.

pub mod classifier;
pub mod dataset;
pub mod detector;
pub mod labels;
pub mod lbph;
pub mod normalize;
#[cfg(feature = "opencv")]
pub mod opencv_lbph;
pub mod pipeline;
pub mod resolver;
pub mod store;
pub mod trainer;
pub mod types;

pub use classifier::{ClassifierError, FaceClassifier};
pub use detector::{DetectorParams, FaceDetector, ScrfdDetector};
pub use labels::LabelSpace;
pub use lbph::{LbphClassifier, LbphParams};
#[cfg(feature = "opencv")]
pub use opencv_lbph::OpencvLbphClassifier;

/// Classifier used by the CLI: OpenCV's LBPH when built with `opencv`,
/// the pure-Rust [`LbphClassifier`] otherwise. Both take [`LbphParams`].
#[cfg(feature = "opencv")]
pub type DefaultClassifier = OpencvLbphClassifier;
#[cfg(not(feature = "opencv"))]
pub type DefaultClassifier = LbphClassifier;
pub use pipeline::{Annotator, FramePipeline, RecognizedFace};
pub use resolver::RecognitionResolver;
pub use store::TrainedModel;
pub use types::{BoundingBox, FaceRect, LabelId, NormalizedFace, Prediction, ResolvedIdentity};
