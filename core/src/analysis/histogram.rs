//! Text rendering of analysis results.
//!
//! Everything here is a pure function of a [`DetectionResult`] so a terminal,
//! a log file or a test can consume the same lines.

use crate::analysis::analyzer::DetectionResult;
use std::collections::{HashMap, VecDeque};

/// Widest `#` bar rendered by [`render_histogram_line`].
pub const DEFAULT_BAR_WIDTH: usize = 180;

/// Rows kept by [`HistogramPanel::default`].
pub const DEFAULT_PANEL_ROWS: usize = 29;

/// Bit pattern under which equal readings are counted together; `-0.0`
/// folds into `0.0`.
fn reading_key(power: f64) -> u64 {
    (power + 0.0).to_bits()
}

/// Exceeding bin whose power reading is shared by the fewest other exceeding
/// bins. Ties go to the lowest bin index.
pub fn distinctive_bin(result: &DetectionResult) -> Option<usize> {
    let mut occurrences: HashMap<u64, usize> = HashMap::new();
    for &power in result.exceeding_bins.values() {
        *occurrences.entry(reading_key(power)).or_insert(0) += 1;
    }

    let mut selected: Option<(usize, usize)> = None;
    for (&index, &power) in &result.exceeding_bins {
        let count = occurrences[&reading_key(power)];
        if selected.map_or(true, |(_, fewest)| count < fewest) {
            selected = Some((index, count));
        }
    }
    selected.map(|(index, _)| index)
}

pub fn render_histogram_line(result: &DetectionResult, timestamp: &str) -> String {
    render_histogram_line_with_width(result, timestamp, DEFAULT_BAR_WIDTH)
}

/// `{timestamp} [{count}] {MHz} : ###`, one `#` per exceeding bin, cut at `bar_width`.
pub fn render_histogram_line_with_width(
    result: &DetectionResult,
    timestamp: &str,
    bar_width: usize,
) -> String {
    let count = result.exceeding_count();
    let frequency = distinctive_bin(result)
        .map(|index| format!("{:.3}", result.bin_frequency_mhz(index)))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} [{:>3}] {:>9} : {}",
        timestamp,
        count,
        frequency,
        "#".repeat(count.min(bar_width))
    )
}

/// Exceeding bins as ` MHz(dBm)` entries joined by commas, in bin order.
pub fn render_frequency_list(result: &DetectionResult) -> String {
    result
        .exceeding_bins
        .iter()
        .map(|(&index, power)| format!(" {:.3}({:?})", result.bin_frequency_mhz(index), power))
        .collect::<Vec<_>>()
        .join(",")
}

/// Scrolling window over the most recent rendered lines, newest last.
#[derive(Debug, Clone)]
pub struct HistogramPanel {
    rows: usize,
    lines: VecDeque<String>,
}

impl HistogramPanel {
    pub fn with_rows(rows: usize) -> Self {
        let rows = rows.max(1);
        Self {
            rows,
            lines: VecDeque::with_capacity(rows),
        }
    }

    pub fn push(&mut self, line: String) {
        if self.lines.len() == self.rows {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for HistogramPanel {
    fn default() -> Self {
        Self::with_rows(DEFAULT_PANEL_ROWS)
    }
}
