pub mod sampling;

pub use sampling::{SamplingWindow, WindowSummary};
