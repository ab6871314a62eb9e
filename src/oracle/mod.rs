//! Frame classification boundary.
//!
//! The scoring core only ever sees "is-target" probabilities. Whatever sits
//! behind [`Oracle`] (a loaded model or the brightness heuristic) is reduced to
//! that convention by [`normalize`].

pub mod heuristic;

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::types::{unit, Classification, Observation};

pub use heuristic::BrightnessHeuristic;

/// One RGBA8 camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, 4 bytes per pixel.
    pub rgba: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self { width, height, rgba }
    }

    /// Frame filled with one colour.
    #[cfg(test)]
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for _ in 0..pixels {
            rgba.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        Self { width, height, rgba }
    }

    /// Area-average colour with channels in [0, 1]. `None` for an empty frame.
    /// Trailing bytes that do not form a whole pixel are ignored.
    pub fn mean_rgb(&self) -> Option<[f64; 3]> {
        let declared = self.width as usize * self.height as usize;
        let available = self.rgba.len() / 4;
        let pixels = declared.min(available);
        if pixels == 0 {
            return None;
        }
        let mut sum = [0u64; 3];
        for px in self.rgba.chunks_exact(4).take(pixels) {
            sum[0] += px[0] as u64;
            sum[1] += px[1] as u64;
            sum[2] += px[2] as u64;
        }
        let n = pixels as f64 * 255.0;
        Some([sum[0] as f64 / n, sum[1] as f64 / n, sum[2] as f64 / n])
    }
}

/// A loaded image classifier. Returns its top label and that label's confidence.
pub trait Classifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<Classification>;
}

/// Convert a top-1 classification into an is-target probability:
/// `confidence` when the label matches the target (case-insensitive),
/// otherwise `1 - confidence`.
pub fn normalize(classification: &Classification, target_label: &str) -> Observation {
    let confidence = unit(classification.confidence);
    let probability = if classification.label.eq_ignore_ascii_case(target_label) {
        confidence
    } else {
        1.0 - confidence
    };
    Observation {
        label: classification.label.clone(),
        confidence,
        probability,
    }
}

/// Frame oracle, chosen once at startup.
pub enum Oracle {
    Model(Box<dyn Classifier>),
    Heuristic(BrightnessHeuristic),
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Oracle::Model(_) => write!(f, "Oracle::Model"),
            Oracle::Heuristic(_) => write!(f, "Oracle::Heuristic"),
        }
    }
}

impl Oracle {
    /// Use the loaded model, or fall back to the heuristic when loading failed.
    pub fn from_loader(loaded: Result<Box<dyn Classifier>>) -> Self {
        match loaded {
            Ok(model) => {
                info!("classifier model loaded");
                Oracle::Model(model)
            }
            Err(e) => {
                warn!("classifier unavailable, using brightness heuristic: {e}");
                Oracle::Heuristic(BrightnessHeuristic)
            }
        }
    }

    #[cfg(test)]
    pub fn heuristic() -> Self {
        Oracle::Heuristic(BrightnessHeuristic)
    }

    #[cfg(test)]
    pub fn is_heuristic(&self) -> bool {
        matches!(self, Oracle::Heuristic(_))
    }

    /// Classify and normalize one frame. A failed or empty frame yields `None`.
    pub fn observe(&mut self, frame: &Frame, target_label: &str) -> Option<Observation> {
        let classification = match self {
            Oracle::Model(model) => match model.classify(frame) {
                Ok(c) => c,
                Err(e) => {
                    warn!("classifier error, dropping frame: {e}");
                    return None;
                }
            },
            Oracle::Heuristic(h) => h.classify(frame)?,
        };
        let obs = normalize(&classification, target_label);
        debug!(label = %obs.label, confidence = obs.confidence, probability = obs.probability, "frame observed");
        Some(obs)
    }
}

/// Admits at most one frame per interval.
#[derive(Debug)]
pub struct FrameThrottle {
    interval: Duration,
    last_admitted: Option<Instant>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last_admitted {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last_admitted = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    struct FixedModel(Classification);

    impl Classifier for FixedModel {
        fn classify(&mut self, _frame: &Frame) -> Result<Classification> {
            Ok(self.0.clone())
        }
    }

    struct FailingModel;

    impl Classifier for FailingModel {
        fn classify(&mut self, _frame: &Frame) -> Result<Classification> {
            Err(AppError::Classifier("inference failed".to_string()))
        }
    }

    #[test]
    fn target_label_keeps_confidence() {
        let obs = normalize(&Classification::new("NOMA", 0.8), "noma");
        assert_eq!(obs.probability, 0.8);
        assert_eq!(obs.label, "NOMA");
    }

    #[test]
    fn other_label_inverts_confidence() {
        let obs = normalize(&Classification::new("normal", 0.75), "noma");
        assert_eq!(obs.probability, 0.25);
    }

    #[test]
    fn confidence_is_clamped_before_inverting() {
        let obs = normalize(&Classification::new("normal", 1.4), "noma");
        assert_eq!(obs.confidence, 1.0);
        assert_eq!(obs.probability, 0.0);
    }

    #[test]
    fn failed_load_selects_heuristic() {
        let oracle = Oracle::from_loader(Err(AppError::ModelUnavailable("missing".to_string())));
        assert!(oracle.is_heuristic());
    }

    #[test]
    fn model_output_is_normalized() {
        let model: Box<dyn Classifier> = Box::new(FixedModel(Classification::new("normal", 0.9)));
        let mut oracle = Oracle::from_loader(Ok(model));
        assert!(!oracle.is_heuristic());
        let obs = oracle.observe(&Frame::solid(2, 2, [0, 0, 0]), "noma").unwrap();
        assert!((obs.probability - 0.1).abs() < 1e-12);
    }

    #[test]
    fn classifier_error_drops_frame() {
        let mut oracle = Oracle::Model(Box::new(FailingModel));
        assert!(oracle.observe(&Frame::solid(1, 1, [10, 10, 10]), "noma").is_none());
    }

    #[test]
    fn mean_rgb_averages_pixels() {
        let frame = Frame::new(2, 1, vec![255, 0, 0, 255, 0, 0, 255, 255]);
        let [r, g, b] = frame.mean_rgb().unwrap();
        assert!((r - 0.5).abs() < 1e-12);
        assert_eq!(g, 0.0);
        assert!((b - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_frame_has_no_mean() {
        assert!(Frame::new(0, 0, vec![]).mean_rgb().is_none());
        assert!(Frame::new(4, 4, vec![1, 2]).mean_rgb().is_none());
    }

    #[test]
    fn throttle_spaces_frames() {
        let t0 = Instant::now();
        let mut throttle = FrameThrottle::new(Duration::from_millis(200));
        assert!(throttle.admit(t0));
        assert!(!throttle.admit(t0 + Duration::from_millis(100)));
        assert!(throttle.admit(t0 + Duration::from_millis(200)));
        assert!(!throttle.admit(t0 + Duration::from_millis(399)));
    }
}
