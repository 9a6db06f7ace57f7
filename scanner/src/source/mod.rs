//! Where sweep lines come from: a file, stdin, a spawned `rtl_power` or the
//! synthetic generator.

use crate::generator::profile::{build_sweep_lines, GeneratorConfig};
use crate::workflow::config::ScannerSettings;
use log::{info, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

/// Failure to obtain sweep lines. Unlike a malformed line this ends the run.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("sweep source {name} unavailable: {source}")]
    Unavailable {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("synthetic sweeps could not be generated: {0}")]
    Synthetic(String),
    #[error("reading from {name} failed: {source}")]
    Read {
        name: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub enum SweepSource {
    File(PathBuf),
    Stdin,
    Command(ScannerSettings),
    Synthetic(GeneratorConfig),
}

impl SweepSource {
    /// `-` selects stdin, as with rtl_power's own output argument.
    pub fn from_path(path: PathBuf) -> Self {
        if path.as_os_str() == "-" {
            SweepSource::Stdin
        } else {
            SweepSource::File(path)
        }
    }

    pub fn name(&self) -> String {
        match self {
            SweepSource::File(path) => path.display().to_string(),
            SweepSource::Stdin => "stdin".to_string(),
            SweepSource::Command(settings) => settings.command_line(),
            SweepSource::Synthetic(config) => format!("synthetic({} sweeps)", config.sweeps),
        }
    }

    pub fn open(&self) -> Result<OpenedSource, SourceError> {
        let name = self.name();
        let unavailable = |source: io::Error| SourceError::Unavailable {
            name: name.clone(),
            source,
        };

        let (reader, child): (Box<dyn BufRead + Send>, Option<Child>) = match self {
            SweepSource::File(path) => {
                info!("opening file {}", path.display());
                let file = File::open(path).map_err(unavailable)?;
                (Box::new(BufReader::new(file)), None)
            }
            SweepSource::Stdin => (Box::new(BufReader::new(io::stdin())), None),
            SweepSource::Command(settings) => {
                info!("spawning {}", settings.command_line());
                let mut child = Command::new(&settings.program)
                    .args(settings.args())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::inherit())
                    .spawn()
                    .map_err(unavailable)?;
                let stdout = child.stdout.take().ok_or_else(|| {
                    unavailable(io::Error::new(io::ErrorKind::BrokenPipe, "no stdout pipe"))
                })?;
                (Box::new(BufReader::new(stdout)), Some(child))
            }
            SweepSource::Synthetic(config) => {
                let lines = build_sweep_lines(config)
                    .map_err(|err| SourceError::Synthetic(format!("{:#}", err)))?;
                let mut text = lines.join("\n");
                text.push('\n');
                (Box::new(Cursor::new(text.into_bytes())), None)
            }
        };

        Ok(OpenedSource {
            name,
            reader,
            child,
        })
    }
}

/// An open stream of sweep lines, owning the scanner process if one was spawned.
pub struct OpenedSource {
    name: String,
    reader: Box<dyn BufRead + Send>,
    child: Option<Child>,
}

impl OpenedSource {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next line without its terminator, `None` at end of stream. Invalid
    /// UTF-8 is replaced rather than rejected so the analyzer can skip it.
    pub fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        let mut buffer = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut buffer)
            .map_err(|source| SourceError::Read {
                name: self.name.clone(),
                source,
            })?;
        if read == 0 {
            return Ok(None);
        }
        while matches!(buffer.last(), Some(b'\n' | b'\r')) {
            buffer.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
    }

    /// Reads to the end of the source, or until `stop` is raised.
    pub fn read_all(&mut self, stop: &AtomicBool) -> Result<Vec<String>, SourceError> {
        let mut lines = Vec::new();
        while !stop.load(Ordering::SeqCst) {
            let Some(line) = self.next_line()? else {
                break;
            };
            lines.push(line);
        }
        Ok(lines)
    }

    /// Stops a spawned scanner. Harmless for other sources.
    pub fn close(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                if err.kind() != io::ErrorKind::InvalidInput {
                    warn!("stopping {} failed: {}", self.name, err);
                }
            }
            match child.wait() {
                Ok(status) => info!("{} exited with {}", self.name, status),
                Err(err) => warn!("waiting for {} failed: {}", self.name, err),
            }
        }
    }
}

impl Drop for OpenedSource {
    fn drop(&mut self) {
        self.close();
    }
}
