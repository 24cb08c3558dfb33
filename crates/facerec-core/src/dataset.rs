//! Dataset directory: one subdirectory per person, face images inside.
//!
//! ```text
//! <root>/<person-name>/<image>.{png,jpg,jpeg}
//! ```
//!
//! Indexing assigns label ids in lexicographic order of person names and
//! collects every decodable image as a 200×200 training sample. The
//! management helpers below only ever remove whole person directories, so
//! the layout stays indexable.

use crate::labels::LabelSpace;
use crate::normalize;
use crate::types::TrainingSample;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const IMAGE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset root not found: {0}")]
    RootNotFound(PathBuf),
    #[error("no usable images found in dataset: {0}")]
    Empty(PathBuf),
    #[error("person not found in dataset: {0}")]
    PersonNotFound(String),
    #[error("invalid person name: {0:?}")]
    InvalidName(String),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DatasetError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Output of indexing: the label space and the ordered training samples.
#[derive(Debug)]
pub struct DatasetIndex {
    pub labels: LabelSpace,
    pub samples: Vec<TrainingSample>,
}

/// True if `file_name` ends in `.png`, `.jpg` or `.jpeg`, ignoring case.
pub fn is_image_file(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Decode by content, not extension: PNG bytes saved as `.jpg` still load.
fn decode(path: &Path) -> image::ImageResult<image::DynamicImage> {
    image::ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Index a dataset root into a label space and training sample set.
///
/// People are visited in lexicographic order; images within a person in
/// directory-listing order. A person's id is minted on their first decodable
/// image, so people without usable images get no id. Undecodable files are
/// skipped.
pub fn index(root: &Path) -> Result<DatasetIndex, DatasetError> {
    if !root.is_dir() {
        return Err(DatasetError::RootNotFound(root.to_path_buf()));
    }

    let mut labels = LabelSpace::new();
    let mut samples = Vec::new();

    for person in people(root)? {
        let person_dir = root.join(&person);
        let entries = fs::read_dir(&person_dir).map_err(|e| DatasetError::io(&person_dir, e))?;
        let before = samples.len();

        for entry in entries {
            let entry = entry.map_err(|e| DatasetError::io(&person_dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !is_image_file(file_name) {
                continue;
            }

            let path = entry.path();
            let img = match decode(&path) {
                Ok(img) => img.to_luma8(),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping undecodable image");
                    continue;
                }
            };
            let Some(face) = normalize::normalize_image(&img) else {
                tracing::debug!(path = %path.display(), "skipping empty image");
                continue;
            };

            let label = labels.get_or_insert(&person);
            samples.push(TrainingSample { face, label });
        }

        let count = samples.len() - before;
        if count == 0 {
            tracing::warn!(person = %person, "no usable images; person left out of label space");
        } else {
            tracing::debug!(person = %person, label = ?labels.id(&person), images = count, "indexed person");
        }
    }

    if samples.is_empty() {
        return Err(DatasetError::Empty(root.to_path_buf()));
    }

    tracing::info!(
        root = %root.display(),
        people = labels.len(),
        samples = samples.len(),
        "dataset indexed"
    );

    Ok(DatasetIndex { labels, samples })
}

/// Person names (immediate subdirectories) in lexicographic order.
///
/// A missing root yields an empty list.
pub fn people(root: &Path) -> Result<Vec<String>, DatasetError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(|e| DatasetError::io(root, e))? {
        let entry = entry.map_err(|e| DatasetError::io(root, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => tracing::warn!(name = ?raw, "skipping non-UTF-8 person directory"),
        }
    }
    names.sort();
    Ok(names)
}

/// Number of image-named files in a person directory; 0 if it cannot be read.
pub fn count_images(person_dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(person_dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_str().is_some_and(is_image_file))
        .count()
}

/// Validate a person name as a single, non-empty path component.
pub fn validate_person_name(name: &str) -> Result<(), DatasetError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    );
    if name.trim().is_empty() || !single_normal || name.contains(['/', '\\']) {
        return Err(DatasetError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Create (if needed) and return the directory for `name` under `root`.
pub fn ensure_person_dir(root: &Path, name: &str) -> Result<PathBuf, DatasetError> {
    validate_person_name(name)?;
    let dir = root.join(name);
    fs::create_dir_all(&dir).map_err(|e| DatasetError::io(&dir, e))?;
    Ok(dir)
}

/// Remove one person's directory. Fails if `name` is not a person in `root`.
pub fn remove_person(root: &Path, name: &str) -> Result<PathBuf, DatasetError> {
    if !people(root)?.iter().any(|p| p == name) {
        return Err(DatasetError::PersonNotFound(name.to_string()));
    }
    let dir = root.join(name);
    fs::remove_dir_all(&dir).map_err(|e| DatasetError::io(&dir, e))?;
    tracing::info!(person = name, path = %dir.display(), "removed person");
    Ok(dir)
}

/// Remove every person directory, keeping the root and any loose files.
///
/// Failures on individual directories are logged and skipped. Returns the
/// number of directories removed.
pub fn remove_all(root: &Path) -> Result<usize, DatasetError> {
    let mut removed = 0;
    for person in people(root)? {
        let dir = root.join(&person);
        match fs::remove_dir_all(&dir) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %dir.display(), error = %e, "failed to remove person"),
        }
    }
    tracing::info!(root = %root.display(), removed, "removed all people");
    Ok(removed)
}
