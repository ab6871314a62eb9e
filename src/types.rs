use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{DEFAULT_MEALS_PER_DAY, MAX_MEALS_PER_DAY, SUGGESTION_THRESHOLD};
use crate::window::WindowSummary;

/// Clamp into [0, 1]. NaN maps to 0.0 so a broken input reads as "no detection".
#[inline]
pub fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Per-frame signal
// ---------------------------------------------------------------------------

/// Probability that one frame shows the target condition.
#[derive(Debug, Clone, Copy)]
pub struct ProbabilitySample {
    pub probability: f64,
    pub at: Instant,
}

impl ProbabilitySample {
    pub fn new(probability: f64, at: Instant) -> Self {
        Self {
            probability: unit(probability),
            at,
        }
    }
}

/// Raw classifier output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Normalized classifier output, shown live before a window completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub label: String,
    /// Clamped raw confidence of `label`.
    pub confidence: f64,
    /// Probability of the target condition.
    pub probability: f64,
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.0}%", self.label, self.confidence * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Questionnaire
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionnaireAnswers {
    pub bad_breath: bool,
    /// Fever, respiratory illness or diarrhea in the last three months.
    pub recent_fever_resp_or_diarrhea: bool,
    pub meals_per_day: u8,
    pub gum_pain: bool,
    pub excessive_salivation: bool,
}

impl Default for QuestionnaireAnswers {
    fn default() -> Self {
        Self {
            bad_breath: false,
            recent_fever_resp_or_diarrhea: false,
            meals_per_day: DEFAULT_MEALS_PER_DAY,
            gum_pain: false,
            excessive_salivation: false,
        }
    }
}

impl QuestionnaireAnswers {
    /// Copy with `meals_per_day` clamped to the accepted range.
    pub fn normalized(mut self) -> Self {
        self.meals_per_day = self.meals_per_day.min(MAX_MEALS_PER_DAY);
        self
    }

    pub fn few_meals(&self) -> bool {
        self.meals_per_day < crate::config::weights::FEW_MEALS_BELOW
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// [0, 0.2)
    VeryNotLikely,
    /// [0.2, 0.4)
    NotLikely,
    /// [0.4, 0.6)
    Neutral,
    /// [0.6, 0.8)
    Likely,
    /// [0.8, 1.0]
    VeryLikely,
}

impl Verdict {
    pub fn from_risk(risk: f64) -> Self {
        use crate::config::verdict_bands::*;
        let risk = unit(risk);
        if risk < NOT_LIKELY_MIN {
            Verdict::VeryNotLikely
        } else if risk < NEUTRAL_MIN {
            Verdict::NotLikely
        } else if risk < LIKELY_MIN {
            Verdict::Neutral
        } else if risk < VERY_LIKELY_MIN {
            Verdict::Likely
        } else {
            Verdict::VeryLikely
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::VeryNotLikely => "Very not likely",
            Verdict::NotLikely => "Not likely",
            Verdict::Neutral => "Neutral",
            Verdict::Likely => "Likely",
            Verdict::VeryLikely => "Very likely",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

/// Where the base probability of an assessment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseSource {
    /// Mean of a completed capture window.
    Window,
    /// Latest per-frame probability; provisional.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub combined_risk: f64,
    pub verdict: Verdict,
    pub suggestion_flag: bool,
    pub base_probability: f64,
    pub source: BaseSource,
}

impl RiskAssessment {
    pub fn new(combined_risk: f64, base_probability: f64, source: BaseSource) -> Self {
        let combined_risk = unit(combined_risk);
        Self {
            combined_risk,
            verdict: Verdict::from_risk(combined_risk),
            suggestion_flag: combined_risk >= SUGGESTION_THRESHOLD,
            base_probability: unit(base_probability),
            source,
        }
    }

    /// Whole percent, truncated.
    pub fn percent(&self) -> u8 {
        (self.combined_risk * 100.0) as u8
    }

    pub fn message(&self) -> &'static str {
        if self.suggestion_flag {
            "Suggestion: consider seeing a clinician for evaluation."
        } else {
            "Low risk: no strong signs detected."
        }
    }
}

// ---------------------------------------------------------------------------
// Session events — sent from the session task to the presentation layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Observation(Observation),
    /// Fraction of the active window elapsed, in [0, 1].
    Progress(f64),
    WindowClosed(WindowSummary),
    Assessment(RiskAssessment),
}
