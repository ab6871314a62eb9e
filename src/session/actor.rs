use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{Config, CHANNEL_CAPACITY};
use crate::error::{AppError, Result};
use crate::oracle::{Frame, FrameThrottle, Oracle};
use crate::session::state::ScreeningState;
use crate::types::{
    BaseSource, Classification, ProbabilitySample, QuestionnaireAnswers, RiskAssessment,
    SessionEvent,
};

/// Point-in-time view of the session for callers polling without events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub collecting: bool,
    pub progress: f64,
    pub final_estimate: Option<f64>,
    pub live_probability: f64,
}

#[derive(Debug)]
pub enum SessionCommand {
    Begin(Duration),
    /// Raw frame; throttled, then classified by the oracle.
    Frame(Frame),
    /// Classification made outside the session.
    Classified(Classification),
    /// Already-normalized is-target probability.
    Probability(f64),
    Answers(QuestionnaireAnswers),
    Reset,
    Assessment(oneshot::Sender<RiskAssessment>),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Single task that owns the screening state. Frames, ticks and caller
/// commands are all applied from its loop, one at a time.
pub struct ScreeningSession {
    state: ScreeningState,
    oracle: Oracle,
    throttle: FrameThrottle,
    target_label: String,
    default_window: Duration,
    tick_interval: Duration,
    command_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
    frames_dropped: u64,
}

/// Cloneable sender side of a running [`ScreeningSession`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl ScreeningSession {
    pub fn new(
        cfg: &Config,
        oracle: Oracle,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> (Self, SessionHandle) {
        let (tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let session = Self {
            state: ScreeningState::new(cfg.fusion_policy()),
            oracle,
            throttle: FrameThrottle::new(cfg.throttle_interval),
            target_label: cfg.target_label.clone(),
            default_window: cfg.window,
            tick_interval: cfg.tick_interval,
            command_rx,
            event_tx,
            frames_dropped: 0,
        };
        (session, SessionHandle { tx })
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = ticker.tick(), if self.state.is_collecting() => {
                    self.handle_tick(Instant::now());
                }
            }
        }
        debug!(frames_dropped = self.frames_dropped, "screening session stopped");
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Begin(duration) => {
                let duration = if duration.is_zero() {
                    self.default_window
                } else {
                    duration
                };
                self.state.begin_capture(Instant::now().into_std(), duration);
                self.emit(SessionEvent::Progress(0.0));
            }
            SessionCommand::Frame(frame) => {
                if !self.throttle.admit(Instant::now().into_std()) {
                    self.frames_dropped += 1;
                    return;
                }
                if let Some(obs) = self.oracle.observe(&frame, &self.target_label) {
                    self.record(obs.probability);
                    self.emit(SessionEvent::Observation(obs));
                }
            }
            SessionCommand::Classified(classification) => {
                let obs = crate::oracle::normalize(&classification, &self.target_label);
                self.record(obs.probability);
                self.emit(SessionEvent::Observation(obs));
            }
            SessionCommand::Probability(p) => self.record(p),
            SessionCommand::Answers(answers) => {
                self.state.submit_questionnaire(answers);
                self.emit_assessment();
            }
            SessionCommand::Reset => {
                self.state.reset();
                self.emit_assessment();
            }
            SessionCommand::Assessment(reply) => {
                let _ = reply.send(self.state.assessment());
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(SessionSnapshot {
                    collecting: self.state.is_collecting(),
                    progress: self.state.progress(),
                    final_estimate: self.state.final_estimate(),
                    live_probability: self.state.live_probability(),
                });
            }
        }
    }

    fn record(&mut self, probability: f64) {
        self.state
            .on_sample(ProbabilitySample::new(probability, Instant::now().into_std()));
        // A live sample moves the assessment unless a positive window estimate is in use.
        if self.state.base_probability().1 == BaseSource::Live {
            self.emit_assessment();
        }
    }

    fn handle_tick(&mut self, now: Instant) {
        let closed = self.state.on_tick(now.into_std());
        self.emit(SessionEvent::Progress(self.state.progress()));
        if let Some(summary) = closed {
            self.emit(SessionEvent::WindowClosed(summary));
            let assessment = self.state.assessment();
            info!(
                event = "ASSESSMENT",
                risk = assessment.combined_risk,
                verdict = %assessment.verdict,
                source = ?assessment.source,
                "risk {}% | {}",
                assessment.percent(),
                assessment.verdict,
            );
            self.emit(SessionEvent::Assessment(assessment));
        }
    }

    fn emit_assessment(&self) {
        self.emit(SessionEvent::Assessment(self.state.assessment()));
    }

    fn emit(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("session event channel full, dropping event: {e}");
        }
    }
}

impl SessionHandle {
    async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|e| AppError::ChannelSend(e.to_string()))
    }

    /// Start a capture window; `None` uses the configured length.
    pub async fn begin_capture(&self, duration: Option<Duration>) -> Result<()> {
        self.send(SessionCommand::Begin(duration.unwrap_or(Duration::ZERO))).await
    }

    pub async fn on_frame(&self, frame: Frame) -> Result<()> {
        self.send(SessionCommand::Frame(frame)).await
    }

    pub async fn on_classification(&self, classification: Classification) -> Result<()> {
        self.send(SessionCommand::Classified(classification)).await
    }

    pub async fn on_frame_probability(&self, probability: f64) -> Result<()> {
        self.send(SessionCommand::Probability(probability)).await
    }

    pub async fn submit_questionnaire(&self, answers: QuestionnaireAnswers) -> Result<()> {
        self.send(SessionCommand::Answers(answers)).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(SessionCommand::Reset).await
    }

    pub async fn assessment(&self) -> Result<RiskAssessment> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Assessment(tx)).await?;
        rx.await
            .map_err(|_| AppError::ChannelSend("session dropped assessment reply".to_string()))
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(tx)).await?;
        rx.await
            .map_err(|_| AppError::ChannelSend("session dropped snapshot reply".to_string()))
    }
}
