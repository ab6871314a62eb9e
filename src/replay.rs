//! JSON-lines input for replaying a recorded capture through a session.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::oracle::Frame;
use crate::session::SessionHandle;
use crate::types::{Classification, QuestionnaireAnswers};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Begin {
        #[serde(default)]
        duration_secs: Option<f64>,
    },
    Classified {
        label: String,
        confidence: f64,
    },
    Frame {
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    },
    Probability {
        p: f64,
    },
    Answers(QuestionnaireAnswers),
    Wait {
        millis: u64,
    },
    Reset,
}

/// Parse one input line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ReplayEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

impl ReplayEvent {
    pub async fn apply(self, handle: &SessionHandle) -> Result<()> {
        match self {
            ReplayEvent::Begin { duration_secs } => {
                // Invalid or non-positive durations fall back to the configured window.
                let duration = duration_secs.and_then(|s| Duration::try_from_secs_f64(s).ok());
                handle.begin_capture(duration).await
            }
            ReplayEvent::Classified { label, confidence } => {
                handle
                    .on_classification(Classification::new(label, confidence))
                    .await
            }
            ReplayEvent::Frame { width, height, rgba } => {
                handle.on_frame(Frame::new(width, height, rgba)).await
            }
            ReplayEvent::Probability { p } => handle.on_frame_probability(p).await,
            ReplayEvent::Answers(answers) => handle.submit_questionnaire(answers).await,
            ReplayEvent::Wait { millis } => {
                debug!(millis, "replay wait");
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(())
            }
            ReplayEvent::Reset => handle.reset().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::oracle::Oracle;
    use crate::session::ScreeningSession;
    use crate::types::Verdict;
    use tokio::sync::mpsc;

    #[test]
    fn parses_tagged_events() {
        assert_eq!(
            parse_line(r#"{"event":"begin"}"#).unwrap(),
            Some(ReplayEvent::Begin { duration_secs: None })
        );
        assert_eq!(
            parse_line(r#"{"event":"classified","label":"noma","confidence":0.7}"#).unwrap(),
            Some(ReplayEvent::Classified {
                label: "noma".to_string(),
                confidence: 0.7
            })
        );
        assert_eq!(
            parse_line(r#"{"event":"wait","millis":250}"#).unwrap(),
            Some(ReplayEvent::Wait { millis: 250 })
        );
        assert_eq!(parse_line(r#"{"event":"reset"}"#).unwrap(), Some(ReplayEvent::Reset));
    }

    #[test]
    fn answers_inline_with_defaults() {
        let event = parse_line(r#"{"event":"answers","bad_breath":true,"meals_per_day":1}"#)
            .unwrap()
            .unwrap();
        match event {
            ReplayEvent::Answers(a) => {
                assert!(a.bad_breath);
                assert_eq!(a.meals_per_day, 1);
                assert!(!a.gum_pain);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# warm-up").unwrap(), None);
    }

    #[test]
    fn malformed_line_is_an_error() {
        assert!(parse_line(r#"{"event":"teleport"}"#).is_err());
        assert!(parse_line("not json").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn replayed_capture_produces_assessment() {
        let (event_tx, _event_rx) = mpsc::channel(1024);
        let (session, handle) = ScreeningSession::new(&Config::default(), Oracle::heuristic(), event_tx);
        tokio::spawn(async move { session.run().await });

        let script = r#"
            {"event":"begin","duration_secs":1.0}
            {"event":"probability","p":0.85}
            {"event":"wait","millis":300}
            {"event":"probability","p":0.95}
            {"event":"wait","millis":1000}
            {"event":"answers","bad_breath":true}
        "#;
        for line in script.lines() {
            if let Some(event) = parse_line(line).unwrap() {
                event.apply(&handle).await.unwrap();
            }
        }

        let a = handle.assessment().await.unwrap();
        // 0.9 + 0.20 * 0.4
        assert!((a.combined_risk - 0.98).abs() < 1e-9);
        assert_eq!(a.verdict, Verdict::VeryLikely);
    }
}
