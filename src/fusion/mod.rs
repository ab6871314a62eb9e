pub mod risk;

pub use risk::{assess, fuse, FusionPolicy};
