use crate::control::ControlCommand;
use crate::presenter::Presenter;
use crate::source::OpenedSource;
use anyhow::Context;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use sweepcore::analysis::analyze_batch;
use sweepcore::telemetry::{MetricsRecorder, MetricsSnapshot, SweepLog};
use sweepcore::{analyze, DetectionConfig, DetectionResult, ParseError, SweepRecord};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Exhausted,
    Quit,
    Interrupted,
}

pub struct RunSummary {
    pub outcome: RunOutcome,
    pub metrics: MetricsSnapshot,
}

/// Drives sweep lines through the analyzer and the presenter.
pub struct Runner<W: Write> {
    config: DetectionConfig,
    presenter: Presenter<W>,
    metrics: MetricsRecorder,
    log: SweepLog,
    stop: Arc<AtomicBool>,
    controls: Option<Receiver<ControlCommand>>,
}

impl<W: Write> Runner<W> {
    pub fn new(config: DetectionConfig, presenter: Presenter<W>) -> Self {
        Self {
            config,
            presenter,
            metrics: MetricsRecorder::new(),
            log: SweepLog::new(),
            stop: Arc::new(AtomicBool::new(false)),
            controls: None,
        }
    }

    /// Flag checked before every line; setting it ends the run.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_controls(mut self, controls: Receiver<ControlCommand>) -> Self {
        self.controls = Some(controls);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn into_presenter(self) -> Presenter<W> {
        self.presenter
    }

    /// Processes lines one at a time until the source ends, a quit key
    /// arrives or the stop flag is raised.
    pub fn run(&mut self, source: &mut OpenedSource) -> anyhow::Result<RunSummary> {
        let mut line_number = 0;
        let outcome = loop {
            if self.stop.load(Ordering::SeqCst) {
                break RunOutcome::Interrupted;
            }
            if !self.drain_controls() {
                break RunOutcome::Quit;
            }
            let Some(line) = source.next_line()? else {
                break RunOutcome::Exhausted;
            };
            line_number += 1;
            self.process_line(line_number, &line)?;
        };

        source.close();
        self.finish(outcome)
    }

    /// Analyzes all lines in parallel, then presents them in input order.
    /// The stop flag is checked before each line is presented.
    pub fn run_batch(&mut self, lines: &[String]) -> anyhow::Result<RunSummary> {
        let results = analyze_batch(lines, &self.config);
        for (index, (line, result)) in lines.iter().zip(results).enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                return self.finish(RunOutcome::Interrupted);
            }
            self.metrics.record_read();
            if line.trim().is_empty() {
                continue;
            }
            self.handle(index + 1, result)?;
        }
        self.finish(RunOutcome::Exhausted)
    }

    fn process_line(&mut self, line_number: usize, line: &str) -> anyhow::Result<()> {
        self.metrics.record_read();
        if line.trim().is_empty() {
            return Ok(());
        }
        let result = SweepRecord::parse(line).map(|record| {
            self.log.header(&record);
            analyze(&record, &self.config)
        });
        self.handle(line_number, result)
    }

    fn handle(
        &mut self,
        line_number: usize,
        result: Result<DetectionResult, ParseError>,
    ) -> anyhow::Result<()> {
        match result {
            Ok(result) => {
                self.log.peak(&result);
                if result.is_detection {
                    self.log.detection(&result);
                }
                self.metrics.record_analyzed(result.is_detection);
                self.presenter
                    .present(&result, &self.config)
                    .context("writing detection output")?;
            }
            Err(err) => {
                self.log.skipped(line_number, &err);
                self.metrics.record_skipped();
            }
        }
        Ok(())
    }

    fn drain_controls(&mut self) -> bool {
        let Some(controls) = self.controls.as_ref() else {
            return true;
        };
        while let Ok(command) = controls.try_recv() {
            if !command.apply(&mut self.config) {
                return false;
            }
        }
        true
    }

    fn finish(&mut self, outcome: RunOutcome) -> anyhow::Result<RunSummary> {
        let metrics = self.metrics.snapshot();
        if self.presenter.verbose() > 0 {
            self.presenter
                .show_panel()
                .context("writing histogram panel")?;
            self.presenter
                .summary(metrics.analyzed, metrics.read)
                .context("writing run summary")?;
        }
        Ok(RunSummary { outcome, metrics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::GeneratorConfig;
    use crate::presenter::{HistogramClock, PresenterOptions};
    use crate::source::SweepSource;
    use std::io::Write as _;
    use std::sync::mpsc;
    use sweepcore::DetectionMode;
    use tempfile::NamedTempFile;

    fn options(verbose: u8) -> PresenterOptions {
        PresenterOptions {
            verbose,
            json: false,
            sound: false,
            bar_width: 40,
            panel_rows: 8,
            clock: HistogramClock::Sweep,
        }
    }

    fn sweep_file(contents: &str) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(contents.as_bytes()).unwrap();
        temp
    }

    const SWEEPS: &str = "2021-01-01,00:00:00,100000000,100004000,4000,10,-80.0,-50.0,-95.0\n\
                          2021-01-01,00:00:00\n\
                          \n\
                          2021-01-01,00:00:01,100000000,100004000,4000,10,-80.0,-70.0,-95.0\n";

    #[test]
    fn runner_skips_malformed_lines_and_continues() {
        let temp = sweep_file(SWEEPS);
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        let mut runner = Runner::new(config, Presenter::new(Vec::new(), options(1)));
        let mut source = SweepSource::File(temp.path().to_path_buf()).open().unwrap();
        let summary = runner.run(&mut source).unwrap();

        assert_eq!(summary.outcome, RunOutcome::Exhausted);
        assert_eq!(summary.metrics.read, 4);
        assert_eq!(summary.metrics.analyzed, 2);
        assert_eq!(summary.metrics.skipped, 1);
        assert_eq!(summary.metrics.detections, 1);

        let text = String::from_utf8(runner.into_presenter().into_inner()).unwrap();
        assert_eq!(
            text,
            "2021-01-01 00:00:00 [  1]   100.004 : #\n\
             \t[ 100.004(-50.0)]\n\
             Location Signal\n\
             2021-01-01 00:00:00 [  1]   100.004 : #\n\
             Processed Lines: 2\n\
             Original Lines: 4\n"
        );
    }

    #[test]
    fn batch_output_matches_streaming_output() {
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::ThresholdCount).unwrap();
        let temp = sweep_file(SWEEPS);

        let mut streaming = Runner::new(config, Presenter::new(Vec::new(), options(2)));
        let mut source = SweepSource::File(temp.path().to_path_buf()).open().unwrap();
        streaming.run(&mut source).unwrap();

        let lines: Vec<String> = SWEEPS.lines().map(str::to_string).collect();
        let mut batch = Runner::new(config, Presenter::new(Vec::new(), options(2)));
        let summary = batch.run_batch(&lines).unwrap();
        assert_eq!(summary.metrics.skipped, 1);

        assert_eq!(
            streaming.into_presenter().into_inner(),
            batch.into_presenter().into_inner()
        );
    }

    /// Sink that raises the stop flag as soon as anything is written to it.
    struct StopOnWrite {
        stop: Arc<AtomicBool>,
        written: Vec<u8>,
    }

    impl std::io::Write for StopOnWrite {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.stop.store(true, Ordering::SeqCst);
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stop_flag_interrupts_batch_partway() {
        let stop = Arc::new(AtomicBool::new(false));
        let sink = StopOnWrite {
            stop: stop.clone(),
            written: Vec::new(),
        };
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        let mut runner =
            Runner::new(config, Presenter::new(sink, options(0))).with_stop_flag(stop);
        let lines: Vec<String> = SWEEPS.lines().map(str::to_string).collect();
        let summary = runner.run_batch(&lines).unwrap();

        assert_eq!(summary.outcome, RunOutcome::Interrupted);
        assert_eq!(summary.metrics.read, 1);
        assert_eq!(summary.metrics.analyzed, 1);
        let sink = runner.into_presenter().into_inner();
        assert_eq!(
            String::from_utf8(sink.written).unwrap(),
            "2021-01-01 00:00:00 [  1]   100.004 : #\n"
        );
    }

    #[test]
    fn stop_flag_interrupts_before_reading() {
        let stop = Arc::new(AtomicBool::new(true));
        let mut runner = Runner::new(
            DetectionConfig::default(),
            Presenter::new(Vec::new(), options(0)),
        )
        .with_stop_flag(stop);
        let mut source = SweepSource::Synthetic(GeneratorConfig::default())
            .open()
            .unwrap();
        let summary = runner.run(&mut source).unwrap();
        assert_eq!(summary.outcome, RunOutcome::Interrupted);
        assert_eq!(summary.metrics.read, 0);
    }

    #[test]
    fn control_keys_update_config_between_sweeps() {
        let (sender, receiver) = mpsc::channel();
        sender.send(ControlCommand::Raise).unwrap();
        sender.send(ControlCommand::Raise).unwrap();
        sender.send(ControlCommand::Lower).unwrap();
        let config = DetectionConfig::new(-60.0, 1, DetectionMode::Search).unwrap();
        let mut runner = Runner::new(config, Presenter::new(Vec::new(), options(0)))
            .with_controls(receiver);
        let mut source = SweepSource::Synthetic(GeneratorConfig {
            sweeps: 2,
            ..Default::default()
        })
        .open()
        .unwrap();
        runner.run(&mut source).unwrap();
        assert_eq!(runner.config().power_threshold, -59.0);

        sender.send(ControlCommand::Quit).unwrap();
        let mut source = SweepSource::Synthetic(GeneratorConfig::default())
            .open()
            .unwrap();
        let summary = runner.run(&mut source).unwrap();
        assert_eq!(summary.outcome, RunOutcome::Quit);
    }
}
