use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::DEFAULT_WINDOW_SECS;
use crate::types::{unit, ProbabilitySample};

/// Result of a window that ran to its full duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSummary {
    /// Mean target probability over the window; 0.0 when no samples arrived.
    pub estimate: f64,
    pub sample_count: u32,
    pub elapsed: Duration,
}

/// Time-boxed accumulator that reduces a stream of per-frame probabilities
/// to one mean estimate.
///
/// Samples are only counted between `begin` and the tick that reaches the
/// configured duration; anything else is discarded. The estimate is produced
/// exactly once per `begin`.
#[derive(Debug)]
pub struct SamplingWindow {
    started_at: Option<Instant>,
    duration: Duration,
    sample_sum: f64,
    sample_count: u32,
    active: bool,
    progress: f64,
}

impl Default for SamplingWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingWindow {
    pub fn new() -> Self {
        Self {
            started_at: None,
            duration: Duration::from_secs_f64(DEFAULT_WINDOW_SECS),
            sample_sum: 0.0,
            sample_count: 0,
            active: false,
            progress: 0.0,
        }
    }

    /// Start a fresh window at `now`. Any window in progress is dropped without
    /// producing an estimate.
    pub fn begin(&mut self, now: Instant, duration: Duration) {
        if self.active {
            debug!(
                dropped_samples = self.sample_count,
                "superseding active sampling window"
            );
        }
        self.started_at = Some(now);
        self.duration = duration;
        self.sample_sum = 0.0;
        self.sample_count = 0;
        self.progress = 0.0;
        self.active = true;
        info!(
            event = "WINDOW_OPEN",
            duration_ms = duration.as_millis() as u64,
            "sampling window opened"
        );
    }

    /// Accumulate one probability. Ignored when no window is active.
    pub fn add_sample(&mut self, probability: f64) {
        if !self.active {
            return;
        }
        self.sample_sum += unit(probability);
        self.sample_count += 1;
    }

    /// Accumulate a timestamped sample. Samples taken before the window
    /// started belong to an earlier capture and are dropped.
    pub fn add(&mut self, sample: ProbabilitySample) {
        if self.started_at.is_some_and(|started_at| sample.at >= started_at) {
            self.add_sample(sample.probability);
        }
    }

    /// Advance the window clock. Returns the summary on the tick that closes
    /// the window and `None` on every other call.
    pub fn tick(&mut self, now: Instant) -> Option<WindowSummary> {
        if !self.active {
            return None;
        }
        let started_at = self.started_at?;
        let elapsed = now.saturating_duration_since(started_at);

        self.progress = if self.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        };

        if elapsed < self.duration {
            return None;
        }

        self.active = false;
        let estimate = if self.sample_count > 0 {
            self.sample_sum / self.sample_count as f64
        } else {
            0.0
        };
        info!(
            event = "WINDOW_CLOSE",
            estimate,
            samples = self.sample_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "sampling window closed | estimate: {:.3} over {} samples",
            estimate,
            self.sample_count,
        );
        Some(WindowSummary {
            estimate,
            sample_count: self.sample_count,
            elapsed,
        })
    }

    /// Stop collecting without producing an estimate.
    pub fn cancel(&mut self) {
        if self.active {
            debug!(dropped_samples = self.sample_count, "sampling window cancelled");
        }
        self.active = false;
        self.progress = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Fraction of the window elapsed as of the last tick.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}
