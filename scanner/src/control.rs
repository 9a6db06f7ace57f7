//! Runtime sensitivity control from single-key commands on stdin.

use log::{debug, info};
use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use sweepcore::DetectionConfig;

/// dBm added or removed per key press.
pub const SENSITIVITY_STEP: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Raise,
    Lower,
    Quit,
}

impl ControlCommand {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            's' => Some(ControlCommand::Raise),
            'S' => Some(ControlCommand::Lower),
            'q' => Some(ControlCommand::Quit),
            _ => None,
        }
    }

    /// Updates `config` in place. Returns `false` when the run should stop.
    pub fn apply(self, config: &mut DetectionConfig) -> bool {
        match self {
            ControlCommand::Raise => config.raise_threshold(SENSITIVITY_STEP),
            ControlCommand::Lower => config.lower_threshold(SENSITIVITY_STEP),
            ControlCommand::Quit => return false,
        }
        info!("threshold now {} dBm", config.power_threshold);
        true
    }
}

/// Reads stdin byte by byte on a background thread and forwards recognised keys.
pub fn spawn_key_listener() -> Receiver<ControlCommand> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for byte in io::stdin().lock().bytes() {
            let Ok(byte) = byte else { break };
            if let Some(command) = ControlCommand::from_key(byte as char) {
                debug!("key command {:?}", command);
                if sender.send(command).is_err() {
                    break;
                }
            }
        }
    });
    receiver
}
