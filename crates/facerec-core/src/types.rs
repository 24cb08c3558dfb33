use serde::{Deserialize, Serialize};

/// Side length of every face image fed to training or inference.
pub const FACE_SIZE: usize = 200;

/// Integer handle for one enrolled person within one trained model.
pub type LabelId = u32;

/// Display name used when a face cannot be resolved to a known person.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

/// Integer face rectangle clamped to frame bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRect {
    /// Round a detector box to whole pixels and clamp it to a `width`×`height` frame.
    ///
    /// Returns `None` when nothing of the box lies inside the frame.
    pub fn from_bbox(bbox: &BoundingBox, width: u32, height: u32) -> Option<Self> {
        let x0 = bbox.x.round().clamp(0.0, width as f32) as u32;
        let y0 = bbox.y.round().clamp(0.0, height as f32) as u32;
        let x1 = (bbox.x + bbox.width).round().clamp(0.0, width as f32) as u32;
        let y1 = (bbox.y + bbox.height).round().clamp(0.0, height as f32) as u32;

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// A 200×200 single-channel face crop.
///
/// The geometry is fixed at construction; the classifier relies on every
/// sample having identical dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFace {
    pixels: Vec<u8>,
}

impl NormalizedFace {
    /// Wrap an already-resized pixel buffer. Returns `None` if the buffer is
    /// not exactly `FACE_SIZE * FACE_SIZE` bytes.
    pub fn from_pixels(pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == FACE_SIZE * FACE_SIZE).then_some(Self { pixels })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// One (normalized image, label id) pair of the training sample set.
#[derive(Debug, Clone)]
pub struct TrainingSample {
    pub face: NormalizedFace,
    pub label: LabelId,
}

/// Raw classifier output for one face: best label and its dissimilarity (0 = exact).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: LabelId,
    pub distance: f32,
}

/// Open-set decision for one face.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    /// A known person name, or [`UNKNOWN_NAME`].
    pub display_name: String,
    /// Confidence percentage in [0, 100].
    pub confidence: f32,
}

impl ResolvedIdentity {
    pub fn is_known(&self) -> bool {
        self.display_name != UNKNOWN_NAME
    }
}
