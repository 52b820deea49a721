pub mod detector;
pub mod indicators;

pub use detector::{SignalConfig, SignalDetector};
