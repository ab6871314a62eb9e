use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use noma_screen::config::{Config, CHANNEL_CAPACITY};
use noma_screen::error::{AppError, Result};
use noma_screen::oracle::{Classifier, Oracle};
use noma_screen::replay::parse_line;
use noma_screen::session::{ScreeningSession, SessionHandle};
use noma_screen::types::SessionEvent;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    info!(
        "Screener ready (window={:.1}s, gate={:.2}, throttle={}ms, target_label={})",
        cfg.window.as_secs_f64(),
        cfg.risk_gate,
        cfg.throttle_interval.as_millis(),
        cfg.target_label,
    );

    let oracle = Oracle::from_loader(load_model(cfg.model_path.as_deref()));

    let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (session, handle) = ScreeningSession::new(&cfg, oracle, event_tx);
    tokio::spawn(async move { session.run().await });
    tokio::spawn(async move { event_logger(event_rx).await });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match parse_line(&line) {
            Ok(Some(event)) => event.apply(&handle).await?,
            Ok(None) => {}
            Err(e) => warn!(line = line_no, "skipping malformed input: {e}"),
        }
    }

    wait_for_window(&handle, cfg.tick_interval).await?;

    let assessment = handle.assessment().await?;
    info!(
        "Result: {}% | {} | {}",
        assessment.percent(),
        assessment.verdict,
        assessment.message(),
    );
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}

/// No inference backend is linked into this binary, so every request ends in
/// the heuristic fallback.
fn load_model(path: Option<&str>) -> Result<Box<dyn Classifier>> {
    match path {
        Some(path) => Err(AppError::ModelUnavailable(format!(
            "{path}: screener has no inference backend"
        ))),
        None => Err(AppError::ModelUnavailable(
            "SCREEN_MODEL_PATH not set".to_string(),
        )),
    }
}

/// Blocks until no capture window is collecting.
async fn wait_for_window(handle: &SessionHandle, poll: Duration) -> Result<()> {
    loop {
        let snap = handle.snapshot().await?;
        if !snap.collecting {
            return Ok(());
        }
        tokio::time::sleep(poll).await;
    }
}

/// Logs session events for the operator.
async fn event_logger(mut rx: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Observation(obs) => {
                debug!(probability = obs.probability, "live: {obs}");
            }
            SessionEvent::Progress(p) => debug!(progress = p, "capture progress"),
            SessionEvent::WindowClosed(s) => info!(
                estimate = s.estimate,
                samples = s.sample_count,
                "capture complete | ulceration score: {:.3} | samples: {}",
                s.estimate,
                s.sample_count,
            ),
            SessionEvent::Assessment(a) => debug!(
                risk = a.combined_risk,
                verdict = %a.verdict,
                suggestion = a.suggestion_flag,
                "assessment updated"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_falls_back_to_heuristic() {
        assert!(matches!(load_model(None), Err(AppError::ModelUnavailable(_))));
        let oracle = Oracle::from_loader(load_model(Some("models/noma.onnx")));
        assert!(matches!(oracle, Oracle::Heuristic(_)));
    }
}
