use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use sweepcore::analysis::{DEFAULT_BAR_WIDTH, DEFAULT_PANEL_ROWS};
use sweepcore::prelude::DEFAULT_POWER_THRESHOLD;
use sweepcore::{DetectionConfig, DetectionMode};

/// How `rtl_power` is launched when no file is given.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScannerSettings {
    pub program: String,
    /// `start:stop:bin` in rtl_power notation.
    pub freq_range: String,
    pub gain: u32,
    /// Integration interval, seconds.
    pub interval: u32,
    /// Stop scanning after this many seconds.
    pub exit_timer: u32,
}

impl ScannerSettings {
    pub fn args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            self.freq_range.clone(),
            "-g".into(),
            self.gain.to_string(),
            "-i".into(),
            self.interval.to_string(),
            "-e".into(),
            self.exit_timer.to_string(),
            "-".into(),
        ]
    }

    pub fn command_line(&self) -> String {
        format!("{} {}", self.program, self.args().join(" "))
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            program: "rtl_power".into(),
            freq_range: "50M:1760M:4000Khz".into(),
            gain: 25,
            interval: 1,
            exit_timer: 14400,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub threshold: f64,
    pub bin_count_threshold: usize,
    pub search: bool,
    pub verbose: u8,
    pub histogram_width: usize,
    pub panel_rows: usize,
    pub scanner: ScannerSettings,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_POWER_THRESHOLD,
            bin_count_threshold: 1,
            search: false,
            verbose: 0,
            histogram_width: DEFAULT_BAR_WIDTH,
            panel_rows: DEFAULT_PANEL_ROWS,
            scanner: ScannerSettings::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn mode(&self) -> DetectionMode {
        if self.search {
            DetectionMode::Search
        } else {
            DetectionMode::ThresholdCount
        }
    }

    pub fn to_detection_config(&self) -> anyhow::Result<DetectionConfig> {
        DetectionConfig::new(self.threshold, self.bin_count_threshold, self.mode())
            .context("invalid detection settings")
    }
}
