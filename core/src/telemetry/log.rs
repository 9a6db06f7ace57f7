use crate::analysis::DetectionResult;
use crate::prelude::ParseError;
use crate::sweep::SweepRecord;
use log::{debug, info, warn};

/// Structured log lines for the sweep pipeline, emitted through the `log` facade.
pub struct SweepLog;

impl SweepLog {
    pub fn new() -> Self {
        Self
    }

    pub fn skipped(&self, line_number: usize, error: &ParseError) {
        warn!("skipping sweep line {}: {}", line_number, error);
    }

    pub fn header(&self, record: &SweepRecord) {
        debug!(
            "sweep {} low={} high={} step={} bins={}",
            record.timestamp(),
            record.freq_low,
            record.freq_high,
            record.freq_step,
            record.powers.len()
        );
    }

    pub fn peak(&self, result: &DetectionResult) {
        match result.peak_frequency {
            Some(frequency) => debug!(
                "peak {} dBm at {} Hz ({} bins over threshold)",
                result.peak_power,
                frequency,
                result.exceeding_count()
            ),
            None => debug!("no finite reading in sweep {}", result.timestamp),
        }
    }

    pub fn detection(&self, result: &DetectionResult) {
        info!(
            "detection at {}: {} bins over threshold",
            result.timestamp,
            result.exceeding_count()
        );
    }
}

impl Default for SweepLog {
    fn default() -> Self {
        Self::new()
    }
}
