pub mod analyzer;
pub mod batch;
pub mod histogram;

pub use analyzer::{analyze, analyze_line, DetectionResult};
pub use batch::analyze_batch;
pub use histogram::{
    distinctive_bin, render_frequency_list, render_histogram_line,
    render_histogram_line_with_width, HistogramPanel, DEFAULT_BAR_WIDTH, DEFAULT_PANEL_ROWS,
};
