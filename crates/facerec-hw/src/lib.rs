//! facerec-hw: camera capture for dataset enrollment and live recognition.
//!
//! Provides V4L2-based grayscale frame capture.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, FrameStream, PixelFormat};
pub use frame::Frame;
