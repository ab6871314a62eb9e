//! Risk fusion core for camera-based noma screening.
//!
//! Per-frame classifier probabilities are averaged over a fixed capture
//! window, then combined with a short questionnaire into a bounded risk score
//! and a five-band verdict.

pub mod config;
pub mod error;
pub mod fusion;
pub mod oracle;
pub mod replay;
pub mod session;
pub mod types;
pub mod window;
