use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use sweepcore::analysis::{
    render_frequency_list, render_histogram_line_with_width, HistogramPanel,
};
use sweepcore::{DetectionConfig, DetectionMode, DetectionResult};

/// Which timestamp leads a histogram line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramClock {
    /// Local time at which the sweep was processed.
    Wall,
    /// Date and time recorded in the sweep itself.
    Sweep,
}

impl HistogramClock {
    fn stamp(self, result: &DetectionResult) -> String {
        match self {
            HistogramClock::Wall => Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            HistogramClock::Sweep => result.timestamp.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresenterOptions {
    pub verbose: u8,
    pub json: bool,
    pub sound: bool,
    pub bar_width: usize,
    pub panel_rows: usize,
    pub clock: HistogramClock,
}

/// Turns analysis results into output text according to mode and verbosity.
pub struct Presenter<W: Write> {
    out: W,
    options: PresenterOptions,
    panel: HistogramPanel,
    histogram_log: Option<File>,
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W, options: PresenterOptions) -> Self {
        let panel = HistogramPanel::with_rows(options.panel_rows);
        Self {
            out,
            options,
            panel,
            histogram_log: None,
        }
    }

    /// Appends every histogram line to `path` as well.
    pub fn with_histogram_log(mut self, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.histogram_log = Some(file);
        Ok(self)
    }

    #[cfg(test)]
    pub fn panel(&self) -> &HistogramPanel {
        &self.panel
    }

    pub fn verbose(&self) -> u8 {
        self.options.verbose
    }

    pub fn present(&mut self, result: &DetectionResult, config: &DetectionConfig) -> io::Result<()> {
        if self.options.json {
            let encoded = serde_json::to_string(result)
                .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
            writeln!(self.out, "{}", encoded)?;
            if result.is_detection {
                self.alert();
            }
            return Ok(());
        }

        match config.mode {
            DetectionMode::ThresholdCount => self.present_threshold_count(result, config),
            DetectionMode::Search => self.present_search(result),
        }
    }

    pub fn summary(&mut self, processed: usize, read: usize) -> io::Result<()> {
        writeln!(self.out, "Processed Lines: {}", processed)?;
        writeln!(self.out, "Original Lines: {}", read)
    }

    /// Writes the scrolling histogram window, newest line last. Nothing is
    /// written while the window is empty.
    pub fn show_panel(&mut self) -> io::Result<()> {
        if self.panel.is_empty() {
            return Ok(());
        }
        writeln!(self.out, "Location Signal")?;
        for line in self.panel.lines() {
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn present_threshold_count(
        &mut self,
        result: &DetectionResult,
        config: &DetectionConfig,
    ) -> io::Result<()> {
        if let (true, Some(frequency)) = (
            result.peak_exceeds(config.power_threshold),
            result.peak_frequency,
        ) {
            writeln!(
                self.out,
                "\t\tDetection in freq: {} with Dbm {}. Time: {}",
                frequency, result.peak_power, result.timestamp
            )?;
        }

        if result.is_detection {
            writeln!(
                self.out,
                "\t\tDetection because {} freq were over the threshold: {}. Time: {}",
                result.exceeding_count(),
                config.power_threshold,
                result.timestamp
            )?;
            self.alert();
        } else if self.options.verbose > 1 {
            writeln!(self.out, "\t\tNo detection")?;
        }
        Ok(())
    }

    fn present_search(&mut self, result: &DetectionResult) -> io::Result<()> {
        let hot = result.exceeding_count() > 0;
        let verbose = self.options.verbose;
        if !hot && verbose < 2 {
            return Ok(());
        }

        let line = render_histogram_line_with_width(
            result,
            &self.options.clock.stamp(result),
            self.options.bar_width,
        );
        writeln!(self.out, "{}", line)?;
        if let Some(log) = self.histogram_log.as_mut() {
            writeln!(log, "{}", line)?;
        }
        self.panel.push(line);

        if verbose >= 1 && hot {
            writeln!(self.out, "\t[{}]", render_frequency_list(result))?;
        }
        if hot {
            self.alert();
        }
        Ok(())
    }

    fn alert(&self) {
        if self.options.sound {
            let mut stderr = io::stderr();
            let _ = stderr.write_all(b"\x07");
            let _ = stderr.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepcore::analyze_line;

    const LINE: &str = "2021-01-01,00:00:00,100000000,100008000,4000,10,-80.0,-50.0,-55.0";

    fn options(verbose: u8) -> PresenterOptions {
        PresenterOptions {
            verbose,
            json: false,
            sound: false,
            bar_width: 10,
            panel_rows: 4,
            clock: HistogramClock::Sweep,
        }
    }

    fn render(line: &str, config: &DetectionConfig, options: PresenterOptions) -> String {
        let result = analyze_line(line, config).unwrap();
        let mut presenter = Presenter::new(Vec::new(), options);
        presenter.present(&result, config).unwrap();
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn threshold_count_reports_peak_and_count() {
        let config = DetectionConfig::new(-60.0, 2, DetectionMode::ThresholdCount).unwrap();
        let text = render(LINE, &config, options(0));
        assert_eq!(
            text,
            "\t\tDetection in freq: 100004000 with Dbm -50. Time: 2021-01-01 00:00:00\n\
             \t\tDetection because 2 freq were over the threshold: -60. Time: 2021-01-01 00:00:00\n"
        );
    }

    #[test]
    fn threshold_count_quiet_unless_verbose() {
        let config = DetectionConfig::new(-10.0, 1, DetectionMode::ThresholdCount).unwrap();
        assert_eq!(render(LINE, &config, options(0)), "");
        assert_eq!(render(LINE, &config, options(2)), "\t\tNo detection\n");
    }

    #[test]
    fn search_levels_follow_verbosity() {
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        assert_eq!(
            render(LINE, &config, options(0)),
            "2021-01-01 00:00:00 [  2]   100.004 : ##\n"
        );
        assert_eq!(
            render(LINE, &config, options(1)),
            "2021-01-01 00:00:00 [  2]   100.004 : ##\n\t[ 100.004(-50.0), 100.008(-55.0)]\n"
        );

        let quiet = DetectionConfig::new(-10.0, 1, DetectionMode::Search).unwrap();
        assert_eq!(render(LINE, &quiet, options(1)), "");
        assert_eq!(
            render(LINE, &quiet, options(2)),
            "2021-01-01 00:00:00 [  0]         - : \n"
        );
    }

    #[test]
    fn json_emits_one_object_per_result() {
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        let text = render(
            LINE,
            &config,
            PresenterOptions {
                json: true,
                ..options(0)
            },
        );
        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["peak_bin_index"], 1);
        assert_eq!(value["is_detection"], true);
        assert_eq!(value["exceeding_bins"]["2"], -55.0);
    }

    #[test]
    fn shown_panel_keeps_only_the_newest_rows() {
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        let mut presenter = Presenter::new(
            Vec::new(),
            PresenterOptions {
                panel_rows: 2,
                ..options(0)
            },
        );
        presenter.show_panel().unwrap();
        for second in 0..3 {
            let line = LINE.replace("00:00:00", &format!("00:00:0{}", second));
            let result = analyze_line(&line, &config).unwrap();
            presenter.present(&result, &config).unwrap();
        }
        presenter.show_panel().unwrap();

        let text = String::from_utf8(presenter.into_inner()).unwrap();
        let window: Vec<&str> = text
            .lines()
            .skip_while(|line| *line != "Location Signal")
            .collect();
        assert_eq!(
            window,
            vec![
                "Location Signal",
                "2021-01-01 00:00:01 [  2]   100.004 : ##",
                "2021-01-01 00:00:02 [  2]   100.004 : ##",
            ]
        );
    }

    #[test]
    fn panel_and_log_receive_histogram_lines() {
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        let log = tempfile::NamedTempFile::new().unwrap();
        let mut presenter = Presenter::new(Vec::new(), options(0))
            .with_histogram_log(log.path())
            .unwrap();
        let result = analyze_line(LINE, &config).unwrap();
        presenter.present(&result, &config).unwrap();
        presenter.present(&result, &config).unwrap();
        assert_eq!(presenter.panel().len(), 2);
        let logged = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(logged.lines().count(), 2);
    }
}
