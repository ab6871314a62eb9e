use std::time::Duration;

use crate::error::{AppError, Result};
use crate::fusion::FusionPolicy;

/// Length of a capture window (seconds).
pub const DEFAULT_WINDOW_SECS: f64 = 5.0;

/// Progress timer interval while a window is collecting (milliseconds).
pub const TICK_INTERVAL_MS: u64 = 50;

/// Minimum spacing between frames handed to the classifier (milliseconds).
/// Frames arriving inside the interval are dropped before classification.
pub const THROTTLE_INTERVAL_MS: u64 = 200;

/// Channel capacity for session commands and events.
pub const CHANNEL_CAPACITY: usize = 256;

/// Classifier label that counts as the target condition (compared case-insensitively).
pub const TARGET_LABEL: &str = "noma";

/// Label emitted by the brightness heuristic for frames it does not flag.
pub const NEGATIVE_LABEL: &str = "normal";

/// Upper bound accepted for `meals_per_day`; larger answers are clamped.
pub const MAX_MEALS_PER_DAY: u8 = 6;

/// Neutral `meals_per_day` answer.
pub const DEFAULT_MEALS_PER_DAY: u8 = 3;

/// Combined risk at or above this shows the clinician suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.6;

/// Questionnaire amplification. Nothing below `GATE` is ever boosted.
pub mod weights {
    /// Base probability at which the questionnaire starts to count.
    pub const GATE: f64 = 0.6;
    /// Boost magnitude is proportional to how far the base exceeds this.
    pub const MIDPOINT: f64 = 0.5;
    pub const BAD_BREATH: f64 = 0.20;
    /// Requires bad breath.
    pub const BAD_BREATH_WITH_ILLNESS: f64 = 0.25;
    /// Requires bad breath and fewer than `FEW_MEALS_BELOW` meals.
    pub const BAD_BREATH_WITH_FEW_MEALS: f64 = 0.15;
    pub const GUM_PAIN: f64 = 0.05;
    pub const EXCESSIVE_SALIVATION: f64 = 0.02;
    pub const FEW_MEALS_BELOW: u8 = 3;
}

/// Verdict band lower bounds (half-open intervals on combined risk).
pub mod verdict_bands {
    pub const NOT_LIKELY_MIN: f64 = 0.2;
    pub const NEUTRAL_MIN: f64 = 0.4;
    pub const LIKELY_MIN: f64 = 0.6;
    pub const VERY_LIKELY_MIN: f64 = 0.8;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Capture window length (SCREEN_WINDOW_SECS)
    pub window: Duration,
    /// Progress tick interval (SCREEN_TICK_MS)
    pub tick_interval: Duration,
    /// Frame throttle interval (SCREEN_THROTTLE_MS)
    pub throttle_interval: Duration,
    /// Questionnaire gate (SCREEN_RISK_GATE)
    pub risk_gate: f64,
    /// Classifier label treated as the target condition (SCREEN_TARGET_LABEL)
    pub target_label: String,
    /// Classifier model to load; unset means use the heuristic (SCREEN_MODEL_PATH)
    pub model_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: Duration::from_secs_f64(DEFAULT_WINDOW_SECS),
            tick_interval: Duration::from_millis(TICK_INTERVAL_MS),
            throttle_interval: Duration::from_millis(THROTTLE_INTERVAL_MS),
            risk_gate: weights::GATE,
            target_label: TARGET_LABEL.to_string(),
            model_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let window_secs = match lookup("SCREEN_WINDOW_SECS") {
            Some(v) => v.trim().parse::<f64>().map_err(|_| {
                AppError::Config("SCREEN_WINDOW_SECS must be a number of seconds".to_string())
            })?,
            None => DEFAULT_WINDOW_SECS,
        };
        let window = Duration::try_from_secs_f64(window_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                AppError::Config("SCREEN_WINDOW_SECS must be finite and greater than zero".to_string())
            })?;

        let tick_ms = parse_millis(&lookup, "SCREEN_TICK_MS", TICK_INTERVAL_MS)?;
        if tick_ms == 0 {
            return Err(AppError::Config("SCREEN_TICK_MS must be greater than zero".to_string()));
        }
        let throttle_ms = parse_millis(&lookup, "SCREEN_THROTTLE_MS", THROTTLE_INTERVAL_MS)?;

        let risk_gate = match lookup("SCREEN_RISK_GATE") {
            Some(v) => v
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|g| (0.0..=1.0).contains(g))
                .ok_or_else(|| AppError::Config("SCREEN_RISK_GATE must be within [0, 1]".to_string()))?,
            None => weights::GATE,
        };

        let target_label = lookup("SCREEN_TARGET_LABEL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| TARGET_LABEL.to_string());

        Ok(Self {
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            window,
            tick_interval: Duration::from_millis(tick_ms),
            throttle_interval: Duration::from_millis(throttle_ms),
            risk_gate,
            target_label,
            model_path: lookup("SCREEN_MODEL_PATH")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }

    pub fn fusion_policy(&self) -> FusionPolicy {
        FusionPolicy {
            gate: self.risk_gate,
            ..FusionPolicy::default()
        }
    }
}

fn parse_millis<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{key} must be a whole number of milliseconds"))),
        None => Ok(default),
    }
}
