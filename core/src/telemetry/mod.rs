pub mod log;
pub mod metrics;

pub use log::SweepLog;
pub use metrics::{MetricsRecorder, MetricsSnapshot};
