use crate::config::{NEGATIVE_LABEL, TARGET_LABEL};
use crate::oracle::Frame;
use crate::types::Classification;

/// Confidence ceiling; the heuristic never claims more certainty than this.
const MAX_CONFIDENCE: f64 = 0.9;

/// Frames darker than this are flagged.
const DARK_BELOW: f64 = 0.5;

/// Fallback estimator used when no classifier model is available.
///
/// Flags dark frames (Rec. 601 luma of the average colour below 0.5) as the
/// target class. It is a placeholder for demos, not a detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrightnessHeuristic;

impl BrightnessHeuristic {
    pub fn classify(&self, frame: &Frame) -> Option<Classification> {
        let [r, g, b] = frame.mean_rgb()?;
        let brightness = 0.299 * r + 0.587 * g + 0.114 * b;
        let classification = if brightness < DARK_BELOW {
            Classification::new(TARGET_LABEL, (1.0 - brightness).min(MAX_CONFIDENCE))
        } else {
            Classification::new(NEGATIVE_LABEL, brightness.min(MAX_CONFIDENCE))
        };
        Some(classification)
    }
}
