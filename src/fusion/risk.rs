use crate::config::weights;
use crate::types::{unit, BaseSource, QuestionnaireAnswers, RiskAssessment};

/// Weights and gate of the questionnaire amplification model.
///
/// Three of the five boosts require bad breath as a co-factor; gum pain and
/// excessive salivation count on their own. Keep that structure when tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionPolicy {
    pub gate: f64,
    pub midpoint: f64,
    pub bad_breath: f64,
    pub bad_breath_with_illness: f64,
    pub bad_breath_with_few_meals: f64,
    pub gum_pain: f64,
    pub excessive_salivation: f64,
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            gate: weights::GATE,
            midpoint: weights::MIDPOINT,
            bad_breath: weights::BAD_BREATH,
            bad_breath_with_illness: weights::BAD_BREATH_WITH_ILLNESS,
            bad_breath_with_few_meals: weights::BAD_BREATH_WITH_FEW_MEALS,
            gum_pain: weights::GUM_PAIN,
            excessive_salivation: weights::EXCESSIVE_SALIVATION,
        }
    }
}

impl FusionPolicy {
    /// Sum of the weights that fire for `answers`, before scaling.
    fn weight_for(&self, answers: &QuestionnaireAnswers) -> f64 {
        let mut w = 0.0;
        if answers.bad_breath {
            w += self.bad_breath;
        }
        if answers.bad_breath && answers.recent_fever_resp_or_diarrhea {
            w += self.bad_breath_with_illness;
        }
        if answers.bad_breath && answers.few_meals() {
            w += self.bad_breath_with_few_meals;
        }
        if answers.gum_pain {
            w += self.gum_pain;
        }
        if answers.excessive_salivation {
            w += self.excessive_salivation;
        }
        w
    }

    /// Combined risk in [0, 1]. Below the gate the base probability passes
    /// through untouched.
    pub fn fuse(&self, base_probability: f64, answers: &QuestionnaireAnswers) -> f64 {
        let p = unit(base_probability);
        if p < self.gate {
            return p;
        }
        let scale = (p - self.midpoint).max(0.0);
        unit(p + self.weight_for(answers) * scale)
    }
}

/// Fuse with the default policy.
pub fn fuse(base_probability: f64, answers: Option<&QuestionnaireAnswers>) -> f64 {
    let neutral = QuestionnaireAnswers::default();
    FusionPolicy::default().fuse(base_probability, answers.unwrap_or(&neutral))
}

/// Fuse and map onto a verdict.
pub fn assess(
    policy: &FusionPolicy,
    base_probability: f64,
    source: BaseSource,
    answers: Option<&QuestionnaireAnswers>,
) -> RiskAssessment {
    let neutral = QuestionnaireAnswers::default();
    let combined = policy.fuse(base_probability, answers.unwrap_or(&neutral));
    RiskAssessment::new(combined, base_probability, source)
}
