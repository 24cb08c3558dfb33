use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "facerec.toml";

/// CLI configuration.
///
/// Layered: built-in defaults, then `facerec.toml` (or `$FACEREC_CONFIG`),
/// then `FACEREC_*` environment variables. Command-line flags are applied
/// on top by the caller.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Dataset root: one subdirectory per person.
    pub dataset_dir: PathBuf,
    /// Directory holding the trained model and labels.
    pub models_dir: PathBuf,
    pub model_name: String,
    pub labels_name: String,
    /// SCRFD ONNX model used for face detection.
    pub detector_model: PathBuf,
    /// V4L2 device path.
    pub camera_device: String,
    /// Minimum confidence percentage (0–100) to show a known name.
    pub confidence_threshold: f32,
    /// Face images to collect per capture session.
    pub samples: usize,
    /// Smallest face side, in pixels, that the detector reports.
    pub min_face_size: u32,
    pub detector_score_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            models_dir: PathBuf::from("models"),
            model_name: "face_recognizer.json".to_string(),
            labels_name: "labels.json".to_string(),
            detector_model: PathBuf::from("models/det_10g.onnx"),
            camera_device: "/dev/video0".to_string(),
            confidence_threshold: facerec_core::resolver::DEFAULT_CONFIDENCE_THRESHOLD,
            samples: 100,
            min_face_size: facerec_core::detector::DEFAULT_MIN_FACE_SIZE,
            detector_score_threshold: facerec_core::detector::DEFAULT_SCORE_THRESHOLD,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl Config {
    /// Load defaults → config file → environment.
    ///
    /// An explicitly named file (`$FACEREC_CONFIG`) must exist; the default
    /// `./facerec.toml` is optional.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os("FACEREC_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Override fields from `FACEREC_*` variables. Unparseable numbers are
    /// ignored with a warning.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("FACEREC_DATASET_DIR") {
            self.dataset_dir = PathBuf::from(v);
        }
        if let Some(v) = var("FACEREC_MODELS_DIR") {
            self.models_dir = PathBuf::from(v);
        }
        if let Some(v) = var("FACEREC_DETECTOR_MODEL") {
            self.detector_model = PathBuf::from(v);
        }
        if let Some(v) = var("FACEREC_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        env_parse(&var, "FACEREC_CONFIDENCE_THRESHOLD", &mut self.confidence_threshold);
        env_parse(&var, "FACEREC_SAMPLES", &mut self.samples);
        env_parse(&var, "FACEREC_MIN_FACE_SIZE", &mut self.min_face_size);
        env_parse(&var, "FACEREC_DETECTOR_SCORE_THRESHOLD", &mut self.detector_score_threshold);
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_name)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.models_dir.join(&self.labels_name)
    }
}

fn env_parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    let Some(raw) = var(key) else {
        return;
    };
    match raw.parse() {
        Ok(v) => *target = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable environment override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.confidence_threshold, 75.0);
        assert_eq!(c.model_path(), PathBuf::from("models/face_recognizer.json"));
        assert_eq!(c.labels_path(), PathBuf::from("models/labels.json"));
        assert_eq!(c.min_face_size, 60);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let c = Config::from_toml("dataset_dir = \"/data/faces\"\nconfidence_threshold = 60.0\n").unwrap();
        assert_eq!(c.dataset_dir, PathBuf::from("/data/faces"));
        assert_eq!(c.confidence_threshold, 60.0);
        assert_eq!(c.samples, 100);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Config::from_toml("treshold = 10").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut c = Config::default();
        c.apply_env(env(&[
            ("FACEREC_CAMERA_DEVICE", "/dev/video2"),
            ("FACEREC_CONFIDENCE_THRESHOLD", "80.5"),
            ("FACEREC_SAMPLES", "not-a-number"),
        ]));
        assert_eq!(c.camera_device, "/dev/video2");
        assert_eq!(c.confidence_threshold, 80.5);
        assert_eq!(c.samples, 100);
    }

    #[test]
    fn test_from_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            Config::from_file(&tmp.path().join("facerec.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
