use crate::prelude::{DetectionConfig, DetectionMode, ParseError};
use crate::sweep::SweepRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const HZ_PER_MHZ: f64 = 1_000_000.0;

/// Outcome of analyzing a single sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// `date time` of the sweep this result was computed from.
    pub timestamp: String,
    pub freq_low: f64,
    pub freq_step: f64,
    /// Strongest finite bin, lowest index on ties. `None` when every bin is `-inf`.
    pub peak_bin_index: Option<usize>,
    /// `-inf` when there is no peak.
    pub peak_power: f64,
    pub peak_frequency: Option<f64>,
    /// Every bin at or above the power threshold, keyed by bin index.
    pub exceeding_bins: BTreeMap<usize, f64>,
    pub is_detection: bool,
}

impl DetectionResult {
    pub fn exceeding_count(&self) -> usize {
        self.exceeding_bins.len()
    }

    /// Whether the peak on its own reaches `threshold`.
    pub fn peak_exceeds(&self, threshold: f64) -> bool {
        self.peak_bin_index.is_some() && self.peak_power >= threshold
    }

    pub fn bin_frequency(&self, index: usize) -> f64 {
        self.freq_low + self.freq_step * index as f64
    }

    pub fn bin_frequency_mhz(&self, index: usize) -> f64 {
        self.bin_frequency(index) / HZ_PER_MHZ
    }
}

/// Scans the bins once, tracking the peak and collecting threshold crossings,
/// then applies the configured detection policy.
pub fn analyze(record: &SweepRecord, config: &DetectionConfig) -> DetectionResult {
    let mut peak: Option<(usize, f64)> = None;
    let mut exceeding_bins = BTreeMap::new();

    for (index, &power) in record.powers.iter().enumerate() {
        let best = peak.map_or(f64::NEG_INFINITY, |(_, best)| best);
        if power > best {
            peak = Some((index, power));
        }
        if power >= config.power_threshold {
            exceeding_bins.insert(index, power);
        }
    }

    let is_detection = match config.mode {
        DetectionMode::ThresholdCount => exceeding_bins.len() >= config.bin_count_threshold,
        DetectionMode::Search => !exceeding_bins.is_empty(),
    };

    DetectionResult {
        timestamp: record.timestamp(),
        freq_low: record.freq_low,
        freq_step: record.freq_step,
        peak_bin_index: peak.map(|(index, _)| index),
        peak_power: peak.map_or(f64::NEG_INFINITY, |(_, power)| power),
        peak_frequency: peak.map(|(index, _)| record.bin_frequency(index)),
        exceeding_bins,
        is_detection,
    }
}

pub fn analyze_line(line: &str, config: &DetectionConfig) -> Result<DetectionResult, ParseError> {
    let record = SweepRecord::parse(line)?;
    Ok(analyze(&record, config))
}
