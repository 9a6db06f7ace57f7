//! Sweep analysis core for rtl_power-based transmitter detection.
//!
//! Each rtl_power CSV line is parsed into a [`SweepRecord`], scanned for its
//! peak bin and the bins above the power threshold, and classified as a
//! detection under the active [`DetectionMode`]. Every sweep is analyzed
//! independently; the configuration is an explicit value, never ambient state.

pub mod analysis;
pub mod prelude;
pub mod sweep;
pub mod telemetry;

pub use analysis::{analyze, analyze_line, render_histogram_line, DetectionResult};
pub use prelude::{ConfigError, DetectionConfig, DetectionMode, ParseError};
pub use sweep::SweepRecord;
