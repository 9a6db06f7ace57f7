use serde::{Deserialize, Serialize};

/// Power threshold used when none is configured, in dBm.
pub const DEFAULT_POWER_THRESHOLD: f64 = 10.8;

/// Policy deciding whether a sweep counts as a detection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Detection when at least `bin_count_threshold` bins are over threshold.
    #[default]
    ThresholdCount,
    /// Detection when any bin is over threshold; the count is the severity.
    Search,
}

/// Read-only detection parameters handed to the analyzer on every call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectionConfig {
    pub power_threshold: f64,
    pub bin_count_threshold: usize,
    pub mode: DetectionMode,
}

impl DetectionConfig {
    pub fn new(
        power_threshold: f64,
        bin_count_threshold: usize,
        mode: DetectionMode,
    ) -> Result<Self, ConfigError> {
        if !power_threshold.is_finite() {
            return Err(ConfigError::NonFiniteThreshold(power_threshold));
        }
        if bin_count_threshold == 0 {
            return Err(ConfigError::ZeroBinCount);
        }
        Ok(Self {
            power_threshold,
            bin_count_threshold,
            mode,
        })
    }

    /// Raising the threshold makes the detector less sensitive.
    pub fn raise_threshold(&mut self, step: f64) {
        self.power_threshold += step;
    }

    pub fn lower_threshold(&mut self, step: f64) {
        self.power_threshold -= step;
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            power_threshold: DEFAULT_POWER_THRESHOLD,
            bin_count_threshold: 1,
            mode: DetectionMode::ThresholdCount,
        }
    }
}

/// A sweep line that could not be turned into a [`crate::SweepRecord`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected at least 6 fields, found {found}")]
    TooFewFields { found: usize },
    #[error("invalid {field} value {value:?}")]
    InvalidHeader { field: &'static str, value: String },
    #[error("invalid power value {value:?} in bin {index}")]
    InvalidPower { index: usize, value: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("power threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),
    #[error("bin count threshold must be at least 1")]
    ZeroBinCount,
}
