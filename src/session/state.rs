use std::time::{Duration, Instant};
use tracing::info;

use crate::fusion::{assess, FusionPolicy};
use crate::types::{unit, BaseSource, ProbabilitySample, QuestionnaireAnswers, RiskAssessment};
use crate::window::{SamplingWindow, WindowSummary};

/// Screening state for one capture session, driven by explicit calls.
///
/// Holds the sampling window, the latest live probability, the completed
/// window estimate and the submitted answers. The assessment is recomputed
/// from those on demand, so reading it has no side effects.
#[derive(Debug)]
pub struct ScreeningState {
    policy: FusionPolicy,
    window: SamplingWindow,
    live_probability: f64,
    final_estimate: Option<f64>,
    answers: Option<QuestionnaireAnswers>,
}

impl ScreeningState {
    pub fn new(policy: FusionPolicy) -> Self {
        Self {
            policy,
            window: SamplingWindow::new(),
            live_probability: 0.0,
            final_estimate: None,
            answers: None,
        }
    }

    pub fn begin_capture(&mut self, now: Instant, duration: Duration) {
        self.window.begin(now, duration);
    }

    /// Record one is-target probability. Counted toward the window only while
    /// it is collecting; always updates the live value.
    pub fn on_frame_probability(&mut self, probability: f64) {
        let p = unit(probability);
        self.live_probability = p;
        self.window.add_sample(p);
    }

    /// Like [`Self::on_frame_probability`], but a sample stamped before the
    /// active window started is not counted toward it.
    pub fn on_sample(&mut self, sample: ProbabilitySample) {
        self.live_probability = sample.probability;
        self.window.add(sample);
    }

    /// Returns the window summary on the tick that closes it.
    pub fn on_tick(&mut self, now: Instant) -> Option<WindowSummary> {
        let summary = self.window.tick(now)?;
        self.final_estimate = Some(summary.estimate);
        Some(summary)
    }

    pub fn submit_questionnaire(&mut self, answers: QuestionnaireAnswers) {
        let answers = answers.normalized();
        info!(
            bad_breath = answers.bad_breath,
            recent_illness = answers.recent_fever_resp_or_diarrhea,
            meals_per_day = answers.meals_per_day,
            gum_pain = answers.gum_pain,
            excessive_salivation = answers.excessive_salivation,
            "questionnaire submitted"
        );
        self.answers = Some(answers);
    }

    /// Clear everything for a new screening. An active window is cancelled.
    pub fn reset(&mut self) {
        self.window.cancel();
        self.live_probability = 0.0;
        self.final_estimate = None;
        self.answers = None;
        info!("screening flow reset");
    }

    /// Completed-window estimate when it is positive, else the live probability.
    pub fn base_probability(&self) -> (f64, BaseSource) {
        match self.final_estimate {
            Some(estimate) if estimate > 0.0 => (estimate, BaseSource::Window),
            _ => (self.live_probability, BaseSource::Live),
        }
    }

    pub fn assessment(&self) -> RiskAssessment {
        let (base, source) = self.base_probability();
        assess(&self.policy, base, source, self.answers.as_ref())
    }

    pub fn is_collecting(&self) -> bool {
        self.window.is_active()
    }

    pub fn progress(&self) -> f64 {
        self.window.progress()
    }

    pub fn final_estimate(&self) -> Option<f64> {
        self.final_estimate
    }

    pub fn live_probability(&self) -> f64 {
        self.live_probability
    }

    pub fn answers(&self) -> Option<&QuestionnaireAnswers> {
        self.answers.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict;

    const FIVE_SECS: Duration = Duration::from_secs(5);

    fn state() -> ScreeningState {
        ScreeningState::new(FusionPolicy::default())
    }

    #[test]
    fn live_probability_used_before_window_completes() {
        let mut s = state();
        s.on_frame_probability(0.35);
        let a = s.assessment();
        assert_eq!(a.source, BaseSource::Live);
        assert_eq!(a.combined_risk, 0.35);
        assert_eq!(a.verdict, Verdict::NotLikely);
    }

    #[test]
    fn window_estimate_replaces_live_signal() {
        let t0 = Instant::now();
        let mut s = state();
        s.begin_capture(t0, FIVE_SECS);
        for p in [0.8, 0.9, 1.0] {
            s.on_frame_probability(p);
        }
        assert!(s.on_tick(t0 + Duration::from_secs(1)).is_none());
        let summary = s.on_tick(t0 + FIVE_SECS).unwrap();
        assert!((summary.estimate - 0.9).abs() < 1e-12);

        // A later low frame does not override the completed window.
        s.on_frame_probability(0.1);
        let a = s.assessment();
        assert_eq!(a.source, BaseSource::Window);
        assert!((a.combined_risk - 0.9).abs() < 1e-12);
        assert_eq!(a.verdict, Verdict::VeryLikely);
    }

    #[test]
    fn empty_window_falls_back_to_live() {
        let t0 = Instant::now();
        let mut s = state();
        s.on_frame_probability(0.45);
        s.begin_capture(t0 + Duration::from_millis(1), FIVE_SECS);
        let summary = s.on_tick(t0 + Duration::from_secs(6)).unwrap();
        assert_eq!(summary.estimate, 0.0);
        assert_eq!(s.final_estimate(), Some(0.0));
        assert_eq!(s.base_probability(), (0.45, BaseSource::Live));
    }

    #[test]
    fn questionnaire_boosts_completed_window() {
        let t0 = Instant::now();
        let mut s = state();
        s.begin_capture(t0, FIVE_SECS);
        s.on_frame_probability(0.9);
        s.on_tick(t0 + FIVE_SECS);
        s.submit_questionnaire(QuestionnaireAnswers {
            bad_breath: true,
            recent_fever_resp_or_diarrhea: true,
            meals_per_day: 2,
            gum_pain: true,
            excessive_salivation: false,
        });
        let a = s.assessment();
        assert_eq!(a.combined_risk, 1.0);
        assert_eq!(a.verdict, Verdict::VeryLikely);
        assert!(a.suggestion_flag);
    }

    #[test]
    fn assessment_is_idempotent() {
        let mut s = state();
        s.on_frame_probability(0.72);
        s.submit_questionnaire(QuestionnaireAnswers {
            gum_pain: true,
            ..Default::default()
        });
        assert_eq!(s.assessment(), s.assessment());
    }

    #[test]
    fn reset_returns_to_neutral() {
        let t0 = Instant::now();
        let mut s = state();
        s.begin_capture(t0, FIVE_SECS);
        s.on_frame_probability(0.9);
        s.submit_questionnaire(QuestionnaireAnswers {
            bad_breath: true,
            ..Default::default()
        });
        s.reset();
        assert!(!s.is_collecting());
        assert!(s.final_estimate().is_none());
        assert!(s.answers().is_none());
        assert_eq!(s.assessment().combined_risk, 0.0);
        assert!(s.on_tick(t0 + FIVE_SECS).is_none());
    }
}
