use anyhow::Context;
use clap::Parser;
use control::spawn_key_listener;
use generator::profile::GeneratorConfig;
use log::{info, LevelFilter};
use presenter::{HistogramClock, Presenter, PresenterOptions};
use source::SweepSource;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::time;
use workflow::config::WorkflowConfig;
use workflow::runner::{RunOutcome, Runner};

mod control;
mod generator;
mod presenter;
mod source;
mod workflow;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Flags likely hidden transmitters in rtl_power sweeps"
)]
struct Args {
    /// rtl_power CSV file, or `-` for stdin. Without it rtl_power is spawned.
    #[arg(short, long)]
    file: Option<PathBuf>,
    /// Power threshold in dBm
    #[arg(short, long, allow_negative_numbers = true)]
    threshold: Option<f64>,
    /// Verbosity level (0-3)
    #[arg(short, long)]
    verbose: Option<u8>,
    /// Number of frequencies that must be over the threshold for a detection
    #[arg(short = 'F', long)]
    detfreqthreshold: Option<usize>,
    /// Search mode: report how many frequencies are over the threshold; ignores -F
    #[arg(short, long, default_value_t = false)]
    search: bool,
    /// Ring the terminal bell on every detection
    #[arg(short = 'S', long, default_value_t = false)]
    sound: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Generate this many synthetic sweeps instead of reading a source
    #[arg(long, conflicts_with = "file")]
    synthetic: Option<usize>,
    /// Emit one JSON result per sweep
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Append histogram lines to this file
    #[arg(long)]
    histogram_log: Option<PathBuf>,
    /// Stamp histogram lines with the sweep's own time instead of the wall clock
    #[arg(long, default_value_t = false)]
    sweep_time: bool,
    /// Read 's' (raise threshold), 'S' (lower) and 'q' (quit) keys from stdin.
    /// The terminal stays line-buffered, so press Enter after each key
    #[arg(long, default_value_t = false)]
    interactive: bool,
    /// Read the whole source first and analyze sweeps in parallel
    #[arg(long, default_value_t = false)]
    batch: bool,
}

impl Args {
    fn workflow_config(&self) -> anyhow::Result<WorkflowConfig> {
        let mut config = match &self.workflow {
            Some(path) => WorkflowConfig::load(path)?,
            None => {
                if self.threshold.is_none() {
                    anyhow::bail!("a power threshold is required (-t) without --workflow");
                }
                WorkflowConfig::default()
            }
        };
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(bins) = self.detfreqthreshold {
            config.bin_count_threshold = bins;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        config.search |= self.search;
        Ok(config)
    }

    fn source(&self, config: &WorkflowConfig) -> SweepSource {
        if let Some(sweeps) = self.synthetic {
            SweepSource::Synthetic(GeneratorConfig {
                sweeps,
                ..Default::default()
            })
        } else if let Some(path) = &self.file {
            SweepSource::from_path(path.clone())
        } else {
            SweepSource::Command(config.scanner.clone())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 | 2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Time a run gets to wind down after Ctrl+C before the process exits.
const INTERRUPT_GRACE: Duration = Duration::from_secs(1);

/// Raises `stop` on Ctrl+C. A run still blocked on input after the grace
/// period, or a second Ctrl+C, ends the process with status 130.
fn install_interrupt_handler(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::spawn(move || {
        if let Err(err) = runtime.block_on(signal::ctrl_c()) {
            log::warn!("Ctrl+C listener failed: {}", err);
            return;
        }
        info!("interrupt received, stopping");
        stop.store(true, Ordering::SeqCst);

        let again = runtime.block_on(time::timeout(INTERRUPT_GRACE, signal::ctrl_c()));
        if again.is_ok() {
            info!("second interrupt, exiting");
        } else {
            info!("still waiting on input, exiting");
        }
        println!("Exiting.");
        process::exit(130);
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let workflow_config = args.workflow_config()?;
    init_logging(workflow_config.verbose);

    let detection = workflow_config.to_detection_config()?;
    let source = args.source(&workflow_config);
    if args.interactive && matches!(source, SweepSource::Stdin) {
        anyhow::bail!("--interactive needs stdin for keys; read sweeps from a file or rtl_power");
    }

    if workflow_config.verbose > 0 {
        println!(
            "Sweepwatch hidden transmitter detector. Version {}\n",
            env!("CARGO_PKG_VERSION")
        );
        println!("Dbm Threshold: {}", detection.power_threshold);
    }

    let clock = if args.sweep_time {
        HistogramClock::Sweep
    } else {
        HistogramClock::Wall
    };
    let mut presenter = Presenter::new(
        io::stdout(),
        PresenterOptions {
            verbose: workflow_config.verbose,
            json: args.json,
            sound: args.sound,
            bar_width: workflow_config.histogram_width,
            panel_rows: workflow_config.panel_rows,
            clock,
        },
    );
    if let Some(path) = &args.histogram_log {
        presenter = presenter
            .with_histogram_log(path)
            .with_context(|| format!("opening histogram log {}", path.display()))?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(stop.clone())?;
    let mut runner = Runner::new(detection, presenter).with_stop_flag(stop.clone());
    if args.interactive {
        runner = runner.with_controls(spawn_key_listener());
    }

    let mut opened = source.open()?;
    let summary = if args.batch {
        let lines = opened.read_all(&stop)?;
        opened.close();
        runner.run_batch(&lines)?
    } else {
        runner.run(&mut opened)?
    };

    info!(
        "{}: {} sweeps analyzed, {} skipped, {} detections, final threshold {} dBm",
        opened.name(),
        summary.metrics.analyzed,
        summary.metrics.skipped,
        summary.metrics.detections,
        runner.config().power_threshold
    );
    if summary.outcome == RunOutcome::Interrupted {
        println!("Exiting.");
    }

    Ok(())
}
