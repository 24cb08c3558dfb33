//! `facerec predict`: live recognition from the camera.

use crate::annotate::OverlayAnnotator;
use crate::capture::detector_params;
use crate::config::Config;
use anyhow::{Context, Result};
use facerec_core::{
    store, DefaultClassifier, FramePipeline, RecognitionResolver, ScrfdDetector, TrainedModel,
};
use facerec_hw::Camera;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct PredictOptions {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub threshold: f32,
    pub save_frames: Option<PathBuf>,
}

/// Annotated frame file for a capture sequence number.
fn frame_file(dir: &Path, sequence: u32) -> PathBuf {
    dir.join(format!("frame_{sequence:06}.png"))
}

/// Run until `stop` is set. Returns the number of frames processed.
pub fn run(config: &Config, opts: &PredictOptions, stop: &AtomicBool) -> Result<u64> {
    let resolver = RecognitionResolver::new(opts.threshold)?;

    let detector = ScrfdDetector::load(&config.detector_model, detector_params(config))
        .context("failed to load face detector")?;
    let model: TrainedModel<DefaultClassifier> = store::load(&opts.model_path, &opts.labels_path)?;
    tracing::info!(
        people = model.labels.len(),
        threshold = resolver.threshold(),
        "model loaded"
    );

    if let Some(dir) = &opts.save_frames {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let camera = Camera::open(&config.camera_device).context("failed to open camera")?;
    let mut stream = camera.stream()?;
    let mut pipeline = FramePipeline::new(detector, model, resolver);
    let mut annotator = OverlayAnnotator::default();

    println!("Running recognition. Press Ctrl-C to quit.");

    let mut frames = 0u64;
    while !stop.load(Ordering::Relaxed) {
        let frame = stream.next_frame()?;
        if frame.is_dark {
            continue;
        }

        annotator.begin_frame();
        pipeline.process_frame(&frame.data, frame.width, frame.height, &mut annotator)?;
        frames += 1;

        let Some(dir) = &opts.save_frames else {
            continue;
        };
        if annotator.faces().is_empty() {
            continue;
        }
        if let Some(img) = annotator.render(&frame.data, frame.width, frame.height) {
            let path = frame_file(dir, frame.sequence);
            img.save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }

    tracing::info!(frames, "recognition stopped");
    Ok(frames)
}
