//! Per-frame recognition: detect → crop/normalize → classify → resolve → annotate.

use crate::classifier::{ClassifierError, FaceClassifier};
use crate::detector::{DetectorError, FaceDetector};
use crate::normalize;
use crate::resolver::RecognitionResolver;
use crate::store::TrainedModel;
use crate::types::{FaceRect, Prediction, ResolvedIdentity};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Receives each resolved face once, in detector order.
pub trait Annotator {
    fn annotate(&mut self, rect: &FaceRect, identity: &ResolvedIdentity);
}

/// One face's result within a frame.
#[derive(Debug, Clone)]
pub struct RecognizedFace {
    pub rect: FaceRect,
    pub prediction: Prediction,
    pub identity: ResolvedIdentity,
}

/// Holds the detector and the immutable model/labels pair for the session.
pub struct FramePipeline<D, C> {
    detector: D,
    model: TrainedModel<C>,
    resolver: RecognitionResolver,
}

impl<D: FaceDetector, C: FaceClassifier> FramePipeline<D, C> {
    pub fn new(detector: D, model: TrainedModel<C>, resolver: RecognitionResolver) -> Self {
        Self {
            detector,
            model,
            resolver,
        }
    }

    pub fn resolver(&self) -> &RecognitionResolver {
        &self.resolver
    }

    /// Convert a decoded image to grayscale and process it.
    pub fn process_image<A: Annotator + ?Sized>(
        &mut self,
        image: &DynamicImage,
        annotator: &mut A,
    ) -> Result<Vec<RecognizedFace>, PipelineError> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        self.process_frame(gray.as_raw(), width, height, annotator)
    }

    /// Process one grayscale frame. Faces are handled independently, in the
    /// order the detector returned them.
    pub fn process_frame<A: Annotator + ?Sized>(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        annotator: &mut A,
    ) -> Result<Vec<RecognizedFace>, PipelineError> {
        let boxes = self.detector.detect(frame, width, height)?;
        let mut faces = Vec::with_capacity(boxes.len());

        for bbox in &boxes {
            let Some(rect) = FaceRect::from_bbox(bbox, width, height) else {
                tracing::debug!(?bbox, "detection outside frame; skipped");
                continue;
            };
            let Some(face) = normalize::crop_and_normalize(frame, width, height, &rect) else {
                continue;
            };

            let prediction = self.model.classifier.predict(&face)?;
            let identity = self.resolver.resolve(prediction, &self.model.labels);

            tracing::debug!(
                label = prediction.label,
                distance = prediction.distance,
                name = %identity.display_name,
                confidence = identity.confidence,
                "face resolved"
            );

            annotator.annotate(&rect, &identity);
            faces.push(RecognizedFace {
                rect,
                prediction,
                identity,
            });
        }

        Ok(faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSpace;
    use crate::types::{BoundingBox, NormalizedFace, TrainingSample, UNKNOWN_NAME};
    use std::path::Path;

    /// Returns a fixed list of boxes every frame.
    struct FixedDetector(Vec<BoundingBox>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _: &[u8], _: u32, _: u32) -> Result<Vec<BoundingBox>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    /// Predicts label = mean brightness / 100, distance = 10.
    struct BrightnessClassifier;

    impl FaceClassifier for BrightnessClassifier {
        fn train(&mut self, _: &[TrainingSample]) -> Result<(), ClassifierError> {
            Ok(())
        }

        fn predict(&self, face: &NormalizedFace) -> Result<Prediction, ClassifierError> {
            let px = face.pixels();
            let mean = px.iter().map(|&p| p as u32).sum::<u32>() / px.len() as u32;
            Ok(Prediction {
                label: mean / 100,
                distance: 10.0,
            })
        }

        fn save(&self, _: &Path) -> Result<(), ClassifierError> {
            Ok(())
        }

        fn load(_: &Path) -> Result<Self, ClassifierError> {
            Ok(Self)
        }
    }

    #[derive(Default)]
    struct Recorder(Vec<(FaceRect, String)>);

    impl Annotator for Recorder {
        fn annotate(&mut self, rect: &FaceRect, identity: &ResolvedIdentity) {
            self.0.push((*rect, identity.display_name.clone()));
        }
    }

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence: 0.9 }
    }

    /// 300x100 frame: dark (50) left third, mid (150) middle, bright (250) right.
    fn frame() -> Vec<u8> {
        (0..300 * 100)
            .map(|i| match i % 300 {
                0..=99 => 50,
                100..=199 => 150,
                _ => 250,
            })
            .collect()
    }

    fn pipeline(boxes: Vec<BoundingBox>) -> FramePipeline<FixedDetector, BrightnessClassifier> {
        let mut labels = LabelSpace::new();
        labels.get_or_insert("Alice");
        labels.get_or_insert("Bob");
        FramePipeline::new(
            FixedDetector(boxes),
            TrainedModel {
                classifier: BrightnessClassifier,
                labels,
            },
            RecognitionResolver::default(),
        )
    }

    #[test]
    fn test_faces_processed_in_detector_order() {
        let mut p = pipeline(vec![
            bbox(200.0, 0.0, 100.0, 100.0),
            bbox(0.0, 0.0, 100.0, 100.0),
            bbox(100.0, 0.0, 100.0, 100.0),
        ]);
        let mut rec = Recorder::default();
        let faces = p.process_frame(&frame(), 300, 100, &mut rec).unwrap();

        assert_eq!(faces.len(), 3);
        let names: Vec<&str> = rec.0.iter().map(|(_, n)| n.as_str()).collect();
        // label 2 is not enrolled, so the bright face is unknown.
        assert_eq!(names, vec![UNKNOWN_NAME, "Alice", "Bob"]);
        assert_eq!(rec.0[0].0, FaceRect { x: 200, y: 0, width: 100, height: 100 });
        assert!(faces.iter().all(|f| (f.identity.confidence - 90.0).abs() < 1e-6));
    }

    #[test]
    fn test_out_of_frame_detection_skipped() {
        let mut p = pipeline(vec![bbox(400.0, 0.0, 50.0, 50.0), bbox(0.0, 0.0, 100.0, 100.0)]);
        let mut rec = Recorder::default();
        let faces = p.process_frame(&frame(), 300, 100, &mut rec).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(rec.0.len(), 1);
    }

    #[test]
    fn test_no_faces() {
        let mut p = pipeline(vec![]);
        let mut rec = Recorder::default();
        assert!(p.process_frame(&frame(), 300, 100, &mut rec).unwrap().is_empty());
        assert!(rec.0.is_empty());
    }

    #[test]
    fn test_threshold_rejects_known_label() {
        let mut labels = LabelSpace::new();
        labels.get_or_insert("Alice");
        let mut p = FramePipeline::new(
            FixedDetector(vec![bbox(0.0, 0.0, 100.0, 100.0)]),
            TrainedModel {
                classifier: BrightnessClassifier,
                labels,
            },
            RecognitionResolver::new(95.0).unwrap(),
        );
        let mut rec = Recorder::default();
        let faces = p.process_frame(&frame(), 300, 100, &mut rec).unwrap();
        assert_eq!(faces[0].prediction.label, 0);
        assert_eq!(faces[0].identity.display_name, UNKNOWN_NAME);
    }

    #[test]
    fn test_process_image_converts_to_gray() {
        let rgb = image::RgbImage::from_pixel(120, 120, image::Rgb([160, 160, 160]));
        let mut p = pipeline(vec![bbox(10.0, 10.0, 100.0, 100.0)]);
        let mut rec = Recorder::default();
        let faces = p
            .process_image(&DynamicImage::ImageRgb8(rgb), &mut rec)
            .unwrap();
        assert_eq!(faces[0].identity.display_name, "Bob");
    }
}
