//! Open-set identity resolution.
//!
//! Turns a raw (label, distance) prediction into a confidence percentage and
//! an accept/reject decision against a single global threshold.

use crate::labels::LabelSpace;
use crate::types::{Prediction, ResolvedIdentity, UNKNOWN_NAME};
use thiserror::Error;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 75.0;

#[derive(Error, Debug, PartialEq)]
pub enum ResolverError {
    #[error("confidence threshold must be within 0..=100, got {0}")]
    ThresholdOutOfRange(f32),
}

/// Map a classifier distance to a confidence percentage: `clamp(100 - d, 0, 100)`.
///
/// Every distance of 100 or more maps to 0%.
pub fn confidence_percent(distance: f32) -> f32 {
    (100.0 - distance).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionResolver {
    threshold: f32,
}

impl Default for RecognitionResolver {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl RecognitionResolver {
    pub fn new(threshold: f32) -> Result<Self, ResolverError> {
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ResolverError::ThresholdOutOfRange(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Resolve one prediction. A confidence equal to the threshold is accepted;
    /// a label missing from `labels` is always "Unknown".
    pub fn resolve(&self, prediction: Prediction, labels: &LabelSpace) -> ResolvedIdentity {
        let confidence = confidence_percent(prediction.distance);
        let name = labels.name(prediction.label);

        if name.is_none() {
            tracing::debug!(label = prediction.label, "label id not in label space");
        }

        let display_name = match name {
            Some(name) if confidence >= self.threshold => name,
            _ => UNKNOWN_NAME,
        };

        ResolvedIdentity {
            display_name: display_name.to_string(),
            confidence,
        }
    }
}
