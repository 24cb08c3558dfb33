mod annotate;
mod capture;
mod config;
mod manage;
mod predict;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use facerec_core::{trainer, DefaultClassifier, LbphParams};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "facerec", about = "Face dataset capture, training and live recognition")]
struct Cli {
    /// Dataset root (one subdirectory per person)
    #[arg(long, global = true)]
    dataset_dir: Option<PathBuf>,
    /// V4L2 camera device
    #[arg(long, global = true)]
    camera: Option<String>,
    /// SCRFD face detector model (ONNX)
    #[arg(long, global = true)]
    detector_model: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture face samples for a person
    Capture {
        /// Person name (becomes the dataset subdirectory)
        #[arg(short, long)]
        name: String,
        /// Number of samples to collect
        #[arg(short, long)]
        samples: Option<usize>,
    },
    /// Train the recognizer on the dataset
    Train {
        /// Output directory for the model and labels
        #[arg(long)]
        models_dir: Option<PathBuf>,
        #[arg(long)]
        model_name: Option<String>,
        #[arg(long)]
        labels_name: Option<String>,
    },
    /// Recognize faces from the camera
    Predict {
        /// Trained model file
        #[arg(long)]
        model: Option<PathBuf>,
        /// Labels file
        #[arg(long)]
        labels: Option<PathBuf>,
        /// Minimum confidence (0-100) to show a known name
        #[arg(long)]
        conf: Option<f32>,
        /// Write frames containing faces to this directory, outlined per face
        /// (names and confidences go to the log, not onto the image)
        #[arg(long)]
        save_frames: Option<PathBuf>,
    },
    /// Inspect or prune the dataset
    #[command(subcommand)]
    Dataset(DatasetCommand),
}

#[derive(Subcommand)]
enum DatasetCommand {
    /// List people and their image counts
    List,
    /// Delete one person's images
    Delete {
        #[arg(short, long)]
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every person in the dataset
    DeleteAll {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Exit status after a second Ctrl-C (128 + SIGINT).
const FORCED_EXIT_CODE: i32 = 130;

/// Record one interrupt. Returns true if one was already recorded, meaning
/// the loop did not stop in time and the process should exit.
fn on_interrupt(stop: &AtomicBool) -> bool {
    stop.swap(true, Ordering::Relaxed)
}

/// Flag set by Ctrl-C; capture loops check it between frames. A second
/// Ctrl-C exits immediately, for a loop stuck on a stalled device.
fn stop_flag() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_interrupt(&flag) {
                tracing::warn!("second interrupt, exiting");
                std::process::exit(FORCED_EXIT_CODE);
            }
            tracing::info!("interrupt received, stopping (Ctrl-C again to force)");
        }
    });
    stop
}

fn train(config: &Config) -> Result<()> {
    std::fs::create_dir_all(&config.models_dir)
        .with_context(|| format!("failed to create {}", config.models_dir.display()))?;

    let mut classifier = DefaultClassifier::new(LbphParams::default())?;
    let summary = trainer::train_from_dir(
        &mut classifier,
        &config.dataset_dir,
        &config.model_path(),
        &config.labels_path(),
    )?;

    println!(
        "Trained on {} images of {} people.",
        summary.samples, summary.people
    );
    println!("Saved model:  {}", summary.model_path.display());
    println!("Saved labels: {}", summary.labels_path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.dataset_dir {
        config.dataset_dir = dir;
    }
    if let Some(camera) = cli.camera {
        config.camera_device = camera;
    }
    if let Some(model) = cli.detector_model {
        config.detector_model = model;
    }

    match cli.command {
        Commands::Capture { name, samples } => {
            let samples = samples.unwrap_or(config.samples);
            let stop = stop_flag();
            tokio::task::spawn_blocking(move || capture::run(&config, &name, samples, &stop))
                .await??;
        }
        Commands::Train {
            models_dir,
            model_name,
            labels_name,
        } => {
            if let Some(dir) = models_dir {
                config.models_dir = dir;
            }
            if let Some(name) = model_name {
                config.model_name = name;
            }
            if let Some(name) = labels_name {
                config.labels_name = name;
            }
            train(&config)?;
        }
        Commands::Predict {
            model,
            labels,
            conf,
            save_frames,
        } => {
            let opts = predict::PredictOptions {
                model_path: model.unwrap_or_else(|| config.model_path()),
                labels_path: labels.unwrap_or_else(|| config.labels_path()),
                threshold: conf.unwrap_or(config.confidence_threshold),
                save_frames,
            };
            let stop = stop_flag();
            tokio::task::spawn_blocking(move || predict::run(&config, &opts, &stop)).await??;
        }
        Commands::Dataset(cmd) => match cmd {
            DatasetCommand::List => manage::list(&config.dataset_dir, &mut std::io::stdout())?,
            DatasetCommand::Delete { name, yes } => manage::delete(&config.dataset_dir, &name, yes)?,
            DatasetCommand::DeleteAll { yes } => manage::delete_all(&config.dataset_dir, yes)?,
        },
    }

    Ok(())
}
