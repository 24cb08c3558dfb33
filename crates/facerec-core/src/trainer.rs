//! Training orchestration: index → train → persist model and labels.

use crate::classifier::{ClassifierError, FaceClassifier};
use crate::dataset::{self, DatasetError, DatasetIndex};
use crate::store::{self, StoreError};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("no training data")]
    NoTrainingData,
    #[error("training failed: {0}")]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

/// What a successful training run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub people: usize,
    pub samples: usize,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
}

/// Index `dataset_root` and train on it. Nothing is written if indexing fails.
pub fn train_from_dir<C: FaceClassifier>(
    classifier: &mut C,
    dataset_root: &Path,
    model_path: &Path,
    labels_path: &Path,
) -> Result<TrainSummary, TrainError> {
    let index = dataset::index(dataset_root)?;
    train(classifier, &index, model_path, labels_path)
}

/// Train from scratch on the full sample set, then write the model and the
/// label space as a pair.
pub fn train<C: FaceClassifier>(
    classifier: &mut C,
    index: &DatasetIndex,
    model_path: &Path,
    labels_path: &Path,
) -> Result<TrainSummary, TrainError> {
    if index.samples.is_empty() {
        return Err(TrainError::NoTrainingData);
    }

    tracing::info!(
        people = index.labels.len(),
        samples = index.samples.len(),
        "training classifier"
    );
    classifier.train(&index.samples)?;

    store::save(classifier, &index.labels, model_path, labels_path)?;

    Ok(TrainSummary {
        people: index.labels.len(),
        samples: index.samples.len(),
        model_path: model_path.to_path_buf(),
        labels_path: labels_path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSpace;
    use crate::lbph::LbphClassifier;
    use crate::resolver::RecognitionResolver;
    use crate::types::{LabelId, NormalizedFace, Prediction, TrainingSample};
    use image::{GrayImage, Luma};
    use std::fs;
    use tempfile::TempDir;

    /// Records what it was trained on.
    #[derive(Default)]
    struct RecordingClassifier {
        trained_labels: Vec<LabelId>,
        train_calls: usize,
    }

    impl FaceClassifier for RecordingClassifier {
        fn train(&mut self, samples: &[TrainingSample]) -> Result<(), ClassifierError> {
            self.train_calls += 1;
            self.trained_labels = samples.iter().map(|s| s.label).collect();
            Ok(())
        }

        fn predict(&self, _face: &NormalizedFace) -> Result<Prediction, ClassifierError> {
            Err(ClassifierError::NotTrained)
        }

        fn save(&self, path: &Path) -> Result<(), ClassifierError> {
            fs::write(path, format!("{:?}", self.trained_labels)).map_err(|source| {
                ClassifierError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            })
        }

        fn load(_path: &Path) -> Result<Self, ClassifierError> {
            Ok(Self::default())
        }
    }

    /// Stripes of a per-person period so each person has a distinct texture.
    fn write_face(dir: &Path, file: &str, period: u32, shift: u32) {
        fs::create_dir_all(dir).unwrap();
        GrayImage::from_fn(200, 200, |x, y| {
            Luma([if ((x + shift) / period + y / period) % 2 == 0 { 30 } else { 220 }])
        })
        .save(dir.join(file))
        .unwrap();
    }

    fn alice_and_bob(root: &Path) {
        for i in 0..3 {
            write_face(&root.join("Alice"), &format!("alice_{i}.png"), 5, i);
        }
        for i in 0..2 {
            write_face(&root.join("Bob"), &format!("bob_{i}.png"), 23, i);
        }
    }

    #[test]
    fn test_two_people_labels_and_samples() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");
        alice_and_bob(&root);
        let model = tmp.path().join("model.bin");
        let labels = tmp.path().join("labels.json");

        let mut clf = RecordingClassifier::default();
        let summary = train_from_dir(&mut clf, &root, &model, &labels).unwrap();

        assert_eq!(summary.people, 2);
        assert_eq!(summary.samples, 5);
        assert_eq!(clf.train_calls, 1);
        assert_eq!(clf.trained_labels, vec![0, 0, 0, 1, 1]);

        let saved = store::load_labels(&labels).unwrap();
        assert_eq!(saved.id("Alice"), Some(0));
        assert_eq!(saved.id("Bob"), Some(1));
        assert!(model.exists());
    }

    #[test]
    fn test_empty_dataset_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");
        fs::create_dir_all(root.join("Alice")).unwrap();
        let model = tmp.path().join("model.bin");
        let labels = tmp.path().join("labels.json");

        let mut clf = RecordingClassifier::default();
        let err = train_from_dir(&mut clf, &root, &model, &labels).unwrap_err();

        assert!(matches!(err, TrainError::Dataset(DatasetError::Empty(_))));
        assert_eq!(clf.train_calls, 0);
        assert!(!model.exists());
        assert!(!labels.exists());
    }

    #[test]
    fn test_empty_index_rejected() {
        let tmp = TempDir::new().unwrap();
        let index = DatasetIndex {
            labels: LabelSpace::new(),
            samples: Vec::new(),
        };
        let mut clf = RecordingClassifier::default();
        let err = train(
            &mut clf,
            &index,
            &tmp.path().join("m"),
            &tmp.path().join("l"),
        )
        .unwrap_err();
        assert!(matches!(err, TrainError::NoTrainingData));
    }

    #[test]
    fn test_unwritable_output_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");
        alice_and_bob(&root);
        let mut clf = RecordingClassifier::default();
        let err = train_from_dir(
            &mut clf,
            &root,
            &tmp.path().join("no/such/model.bin"),
            &tmp.path().join("no/such/labels.json"),
        )
        .unwrap_err();
        assert!(matches!(err, TrainError::Persistence(_)));
    }

    #[test]
    fn test_lbph_end_to_end_recognizes_training_image() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");
        alice_and_bob(&root);
        let model = tmp.path().join("face_recognizer.json");
        let labels = tmp.path().join("labels.json");

        let mut clf = LbphClassifier::default();
        train_from_dir(&mut clf, &root, &model, &labels).unwrap();

        let loaded: store::TrainedModel<LbphClassifier> = store::load(&model, &labels).unwrap();
        let index = dataset::index(&root).unwrap();
        let bob_sample = index.samples.iter().find(|s| s.label == 1).unwrap();
        let prediction = loaded.classifier.predict(&bob_sample.face).unwrap();

        let resolver = RecognitionResolver::default();
        let identity = resolver.resolve(prediction, &loaded.labels);
        assert_eq!(identity.display_name, "Bob");
        assert_eq!(identity.confidence, 100.0);
    }

    /// Known limitation: a label file from another run is accepted as-is.
    #[test]
    fn test_swapped_label_file_goes_undetected() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("dataset");
        alice_and_bob(&root);
        let model = tmp.path().join("face_recognizer.json");
        let labels = tmp.path().join("labels.json");

        let mut clf = LbphClassifier::default();
        train_from_dir(&mut clf, &root, &model, &labels).unwrap();

        // Labels from a different training run where "Aaron" sorted first.
        let mut other = LabelSpace::new();
        other.get_or_insert("Aaron");
        other.get_or_insert("Alice");
        store::save_labels(&other, &labels).unwrap();

        let loaded: store::TrainedModel<LbphClassifier> = store::load(&model, &labels).unwrap();
        let index = dataset::index(&root).unwrap();
        let bob_sample = index.samples.iter().find(|s| s.label == 1).unwrap();
        let prediction = loaded.classifier.predict(&bob_sample.face).unwrap();
        let identity = RecognitionResolver::default().resolve(prediction, &loaded.labels);

        assert_eq!(identity.display_name, "Alice");
    }
}
