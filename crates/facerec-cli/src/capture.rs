//! `facerec capture`: collect face crops for one person from the camera.

use crate::config::Config;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use facerec_core::detector::{DetectorParams, FaceDetector, ScrfdDetector};
use facerec_core::types::FACE_SIZE;
use facerec_core::{dataset, normalize, FaceRect};
use facerec_hw::Camera;
use image::GrayImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub fn detector_params(config: &Config) -> DetectorParams {
    DetectorParams {
        score_threshold: config.detector_score_threshold,
        min_face_size: config.min_face_size,
    }
}

/// `<name>_<YYYYmmdd_HHMMSS_micros>.jpg`
pub fn sample_file_name(name: &str, at: &DateTime<Local>) -> String {
    format!("{name}_{}.jpg", at.format("%Y%m%d_%H%M%S_%6f"))
}

/// Pick a path in `dir` that does not exist yet, suffixing `_N` on collision.
fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = file_name.trim_end_matches(".jpg");
    (1..)
        .map(|n| dir.join(format!("{stem}_{n}.jpg")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Capture until `samples` crops are saved or `stop` is set. Returns the count saved.
pub fn run(config: &Config, name: &str, samples: usize, stop: &AtomicBool) -> Result<usize> {
    let person_dir = dataset::ensure_person_dir(&config.dataset_dir, name)?;

    let mut detector = ScrfdDetector::load(&config.detector_model, detector_params(config))
        .context("failed to load face detector")?;

    let camera = Camera::open(&config.camera_device).context("failed to open camera")?;
    let mut stream = camera.stream()?;

    println!("Capturing faces for '{name}'. Press Ctrl-C to stop early.");

    let mut count = 0usize;
    while count < samples && !stop.load(Ordering::Relaxed) {
        let frame = stream.next_frame()?;
        if frame.is_dark {
            tracing::debug!(seq = frame.sequence, "skipping dark frame");
            continue;
        }

        let boxes = detector.detect(&frame.data, frame.width, frame.height)?;
        for bbox in &boxes {
            if count >= samples {
                break;
            }
            let Some(rect) = FaceRect::from_bbox(bbox, frame.width, frame.height) else {
                continue;
            };
            let Some(face) = normalize::crop_and_normalize(&frame.data, frame.width, frame.height, &rect)
            else {
                continue;
            };

            let img = GrayImage::from_raw(FACE_SIZE as u32, FACE_SIZE as u32, face.into_pixels())
                .context("normalized face has unexpected size")?;
            let path = unique_path(&person_dir, &sample_file_name(name, &Local::now()));
            img.save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;

            count += 1;
            tracing::debug!(path = %path.display(), count, "saved face sample");
        }

        if !boxes.is_empty() {
            println!("Collected: {count}/{samples}");
        }
    }

    println!("Saved {count} images to: {}", person_dir.display());
    Ok(count)
}
