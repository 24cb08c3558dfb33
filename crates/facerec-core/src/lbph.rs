//! Local Binary Patterns Histograms (LBPH) face classifier.
//!
//! Each face is encoded as a grid of circular-LBP histograms; prediction is
//! the nearest training histogram under the chi-square distance.

use crate::classifier::{ClassifierError, FaceClassifier};
use crate::types::{LabelId, NormalizedFace, Prediction, TrainingSample, FACE_SIZE};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

// --- Default parameters ---
const LBPH_RADIUS: u32 = 1;
const LBPH_NEIGHBORS: u32 = 8;
const LBPH_GRID_X: u32 = 8;
const LBPH_GRID_Y: u32 = 8;
/// Upper bound on neighbors; 2^16 bins per cell is already very sparse.
const LBPH_MAX_NEIGHBORS: u32 = 16;
/// Interpolated samples within this of the center count as equal.
const LBP_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbphParams {
    pub radius: u32,
    pub neighbors: u32,
    pub grid_x: u32,
    pub grid_y: u32,
}

impl Default for LbphParams {
    fn default() -> Self {
        Self {
            radius: LBPH_RADIUS,
            neighbors: LBPH_NEIGHBORS,
            grid_x: LBPH_GRID_X,
            grid_y: LBPH_GRID_Y,
        }
    }
}

impl LbphParams {
    pub(crate) fn validate(&self) -> Result<(), ClassifierError> {
        if self.radius == 0 || self.neighbors == 0 || self.neighbors > LBPH_MAX_NEIGHBORS {
            return Err(ClassifierError::InvalidParams(format!(
                "radius must be >= 1 and neighbors in 1..={LBPH_MAX_NEIGHBORS}, got {self:?}"
            )));
        }
        let lbp_side = FACE_SIZE as u32 - 2 * self.radius.min(FACE_SIZE as u32 / 2);
        if self.grid_x == 0 || self.grid_y == 0 || self.grid_x > lbp_side || self.grid_y > lbp_side {
            return Err(ClassifierError::InvalidParams(format!(
                "grid must be between 1 and {lbp_side} cells per side, got {}x{}",
                self.grid_x, self.grid_y
            )));
        }
        Ok(())
    }

    fn bins(&self) -> usize {
        1usize << self.neighbors
    }

    fn histogram_len(&self) -> usize {
        self.bins() * (self.grid_x * self.grid_y) as usize
    }
}

/// On-disk model layout.
#[derive(Serialize, Deserialize)]
struct LbphModel {
    params: LbphParams,
    histograms: Vec<Vec<f32>>,
    labels: Vec<LabelId>,
}

/// LBPH classifier. Untrained until [`FaceClassifier::train`] succeeds.
#[derive(Debug, Clone)]
pub struct LbphClassifier {
    params: LbphParams,
    histograms: Vec<Vec<f32>>,
    labels: Vec<LabelId>,
}

impl Default for LbphClassifier {
    fn default() -> Self {
        Self {
            params: LbphParams::default(),
            histograms: Vec::new(),
            labels: Vec::new(),
        }
    }
}

impl LbphClassifier {
    pub fn new(params: LbphParams) -> Result<Self, ClassifierError> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    pub fn params(&self) -> &LbphParams {
        &self.params
    }

    /// Number of training histograms held.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    fn histogram(&self, face: &NormalizedFace) -> Vec<f32> {
        let (lbp, lw, lh) = elbp(
            face.pixels(),
            FACE_SIZE,
            FACE_SIZE,
            self.params.radius as usize,
            self.params.neighbors as usize,
        );
        spatial_histogram(&lbp, lw, lh, &self.params)
    }
}

impl FaceClassifier for LbphClassifier {
    fn train(&mut self, samples: &[TrainingSample]) -> Result<(), ClassifierError> {
        if samples.is_empty() {
            return Err(ClassifierError::NoTrainingData);
        }

        let histograms = samples.iter().map(|s| self.histogram(&s.face)).collect();
        self.histograms = histograms;
        self.labels = samples.iter().map(|s| s.label).collect();

        tracing::info!(
            samples = self.histograms.len(),
            params = ?self.params,
            "LBPH model trained"
        );
        Ok(())
    }

    fn predict(&self, face: &NormalizedFace) -> Result<Prediction, ClassifierError> {
        if self.histograms.is_empty() {
            return Err(ClassifierError::NotTrained);
        }

        let query = self.histogram(face);
        let mut best = Prediction {
            label: self.labels[0],
            distance: f32::INFINITY,
        };

        for (hist, &label) in self.histograms.iter().zip(&self.labels) {
            let distance = chi_square(hist, &query);
            if distance < best.distance {
                best = Prediction { label, distance };
            }
        }

        Ok(best)
    }

    fn save(&self, path: &Path) -> Result<(), ClassifierError> {
        let model = LbphModel {
            params: self.params,
            histograms: self.histograms.clone(),
            labels: self.labels.clone(),
        };
        let json = serde_json::to_vec(&model).map_err(|e| ClassifierError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, json).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), samples = model.labels.len(), "LBPH model written");
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, ClassifierError> {
        let bytes = fs::read(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: LbphModel = serde_json::from_slice(&bytes).map_err(|e| ClassifierError::Format {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        model.params.validate()?;
        if model.histograms.len() != model.labels.len() {
            return Err(ClassifierError::Format {
                path: path.to_path_buf(),
                message: format!(
                    "{} histograms but {} labels",
                    model.histograms.len(),
                    model.labels.len()
                ),
            });
        }
        let expected = model.params.histogram_len();
        if let Some(bad) = model.histograms.iter().find(|h| h.len() != expected) {
            return Err(ClassifierError::GeometryMismatch(format!(
                "expected {expected}-bin histograms, found {}",
                bad.len()
            )));
        }

        tracing::info!(path = %path.display(), samples = model.labels.len(), "LBPH model loaded");

        Ok(Self {
            params: model.params,
            histograms: model.histograms,
            labels: model.labels,
        })
    }
}

/// Extended (circular) LBP.
///
/// Returns the code image and its dimensions, which exclude a `radius`-wide border.
fn elbp(
    src: &[u8],
    width: usize,
    height: usize,
    radius: usize,
    neighbors: usize,
) -> (Vec<u32>, usize, usize) {
    if width <= 2 * radius || height <= 2 * radius {
        return (Vec::new(), 0, 0);
    }
    let out_w = width - 2 * radius;
    let out_h = height - 2 * radius;
    let mut dst = vec![0u32; out_w * out_h];
    let r = radius as f32;

    for n in 0..neighbors {
        let angle = 2.0 * PI * n as f32 / neighbors as f32;
        let x = r * angle.cos();
        let y = -r * angle.sin();

        let fx = x.floor() as isize;
        let fy = y.floor() as isize;
        let cx = x.ceil() as isize;
        let cy = y.ceil() as isize;

        let tx = x - fx as f32;
        let ty = y - fy as f32;
        let w1 = (1.0 - tx) * (1.0 - ty);
        let w2 = tx * (1.0 - ty);
        let w3 = (1.0 - tx) * ty;
        let w4 = tx * ty;

        let px = |row: usize, dy: isize, col: usize, dx: isize| -> f32 {
            let yy = (row as isize + dy) as usize;
            let xx = (col as isize + dx) as usize;
            src[yy * width + xx] as f32
        };

        for i in radius..height - radius {
            for j in radius..width - radius {
                let center = src[i * width + j] as f32;
                let t = w1 * px(i, fy, j, fx)
                    + w2 * px(i, fy, j, cx)
                    + w3 * px(i, cy, j, fx)
                    + w4 * px(i, cy, j, cx);
                if t >= center - LBP_TOLERANCE {
                    dst[(i - radius) * out_w + (j - radius)] |= 1 << n;
                }
            }
        }
    }

    (dst, out_w, out_h)
}

/// Concatenated per-cell histograms, each normalized by its cell's pixel count.
fn spatial_histogram(lbp: &[u32], width: usize, height: usize, params: &LbphParams) -> Vec<f32> {
    let bins = params.bins();
    let (gx, gy) = (params.grid_x as usize, params.grid_y as usize);
    let cell_w = width / gx;
    let cell_h = height / gy;
    let mut out = vec![0f32; params.histogram_len()];

    if cell_w == 0 || cell_h == 0 {
        return out;
    }
    let norm = 1.0 / (cell_w * cell_h) as f32;

    for row in 0..gy {
        for col in 0..gx {
            let hist = &mut out[(row * gx + col) * bins..(row * gx + col + 1) * bins];
            for y in row * cell_h..(row + 1) * cell_h {
                for x in col * cell_w..(col + 1) * cell_w {
                    hist[lbp[y * width + x] as usize] += norm;
                }
            }
        }
    }

    out
}

/// Chi-square distance, summed over bins where the reference histogram is non-zero.
fn chi_square(reference: &[f32], query: &[f32]) -> f32 {
    reference
        .iter()
        .zip(query)
        .filter(|(a, _)| a.abs() > f32::EPSILON)
        .map(|(&a, &b)| {
            let d = (a - b) as f64;
            d * d / a as f64
        })
        .sum::<f64>() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Deterministic noise texture; different seeds give different patterns.
    fn texture(seed: u32) -> NormalizedFace {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        let pixels = (0..FACE_SIZE * FACE_SIZE)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        NormalizedFace::from_pixels(pixels).unwrap()
    }

    fn gradient() -> NormalizedFace {
        let pixels = (0..FACE_SIZE * FACE_SIZE)
            .map(|i| ((i % FACE_SIZE) + (i / FACE_SIZE)) as u8)
            .collect();
        NormalizedFace::from_pixels(pixels).unwrap()
    }

    fn sample(face: NormalizedFace, label: LabelId) -> TrainingSample {
        TrainingSample { face, label }
    }

    #[test]
    fn test_elbp_uniform_sets_all_bits() {
        // Every neighbor equals the center, so every bit is set.
        let src = vec![100u8; 10 * 10];
        let (lbp, w, h) = elbp(&src, 10, 10, 1, 8);
        assert_eq!((w, h), (8, 8));
        assert!(lbp.iter().all(|&c| c == 0xFF));
    }

    #[test]
    fn test_elbp_bright_center_clears_bits() {
        let mut src = vec![10u8; 3 * 3];
        src[4] = 250;
        let (lbp, w, h) = elbp(&src, 3, 3, 1, 8);
        assert_eq!((w, h), (1, 1));
        assert_eq!(lbp[0], 0);
    }

    #[test]
    fn test_cell_histograms_normalized() {
        let params = LbphParams::default();
        let clf = LbphClassifier::new(params).unwrap();
        let hist = clf.histogram(&texture(3));
        assert_eq!(hist.len(), params.histogram_len());
        for cell in hist.chunks(params.bins()) {
            let total: f32 = cell.iter().sum();
            assert!((total - 1.0).abs() < 1e-3, "cell sum {total}");
        }
    }

    #[test]
    fn test_chi_square_identical_is_zero() {
        let a = vec![0.25, 0.25, 0.5, 0.0];
        assert_eq!(chi_square(&a, &a), 0.0);
    }

    #[test]
    fn test_chi_square_skips_empty_reference_bins() {
        let a = vec![0.5, 0.5, 0.0];
        let b = vec![0.5, 0.25, 0.25];
        // Only bin 1 contributes: 0.25^2 / 0.5
        assert!((chi_square(&a, &b) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_predict_untrained() {
        let clf = LbphClassifier::default();
        assert!(matches!(clf.predict(&texture(1)), Err(ClassifierError::NotTrained)));
    }

    #[test]
    fn test_train_empty() {
        let mut clf = LbphClassifier::default();
        assert!(matches!(clf.train(&[]), Err(ClassifierError::NoTrainingData)));
    }

    #[test]
    fn test_predict_exact_match() {
        let mut clf = LbphClassifier::default();
        clf.train(&[
            sample(texture(1), 0),
            sample(gradient(), 1),
            sample(texture(2), 2),
        ])
        .unwrap();

        let p = clf.predict(&gradient()).unwrap();
        assert_eq!(p.label, 1);
        assert_eq!(p.distance, 0.0);

        let p = clf.predict(&texture(2)).unwrap();
        assert_eq!(p.label, 2);
        assert_eq!(p.distance, 0.0);
    }

    #[test]
    fn test_different_faces_have_positive_distance() {
        let mut clf = LbphClassifier::default();
        clf.train(&[sample(gradient(), 0)]).unwrap();
        let p = clf.predict(&texture(9)).unwrap();
        assert_eq!(p.label, 0);
        assert!(p.distance > 0.0);
    }

    #[test]
    fn test_retrain_forgets_previous_state() {
        let mut clf = LbphClassifier::default();
        clf.train(&[sample(texture(1), 0), sample(texture(2), 0)]).unwrap();
        clf.train(&[sample(gradient(), 5)]).unwrap();
        assert_eq!(clf.len(), 1);
        assert_eq!(clf.predict(&texture(1)).unwrap().label, 5);
    }

    #[test]
    fn test_save_load_preserves_predictions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.json");

        let mut clf = LbphClassifier::default();
        clf.train(&[sample(texture(4), 3), sample(gradient(), 7)]).unwrap();
        clf.save(&path).unwrap();

        let loaded = LbphClassifier::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.params(), clf.params());
        let p = loaded.predict(&texture(4)).unwrap();
        assert_eq!(p.label, 3);
        assert_eq!(p.distance, 0.0);
    }

    #[test]
    fn test_load_garbage() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.json");
        fs::write(&path, b"<opencv_storage/>").unwrap();
        assert!(matches!(LbphClassifier::load(&path), Err(ClassifierError::Format { .. })));
    }

    #[test]
    fn test_load_wrong_histogram_size() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.json");
        let model = LbphModel {
            params: LbphParams::default(),
            histograms: vec![vec![0.0; 10]],
            labels: vec![0],
        };
        fs::write(&path, serde_json::to_vec(&model).unwrap()).unwrap();
        assert!(matches!(
            LbphClassifier::load(&path),
            Err(ClassifierError::GeometryMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_params() {
        for params in [
            LbphParams { radius: 0, ..LbphParams::default() },
            LbphParams { neighbors: 17, ..LbphParams::default() },
            LbphParams { grid_x: 0, ..LbphParams::default() },
        ] {
            assert!(LbphClassifier::new(params).is_err(), "{params:?}");
        }
    }
}
