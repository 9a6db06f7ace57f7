use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sweepcore::SweepRecord;

/// A carrier injected into synthetic sweeps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transmitter {
    pub frequency: f64,
    pub power: f64,
    /// Bins on each side of the centre that also carry the signal.
    pub spread_bins: usize,
    /// Fraction of sweeps in which the transmitter is keyed.
    pub duty_cycle: f64,
}

/// Configuration for generating synthetic rtl_power sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub sweeps: usize,
    pub freq_low: f64,
    pub freq_high: f64,
    pub freq_step: f64,
    pub noise_floor: f64,
    pub noise: f64,
    /// Probability that a bin reports `-inf`.
    pub dropout: f64,
    pub seed: u64,
    pub transmitter: Option<Transmitter>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sweeps: 60,
            freq_low: 100_000_000.0,
            freq_high: 120_000_000.0,
            freq_step: 250_000.0,
            noise_floor: -75.0,
            noise: 3.0,
            dropout: 0.01,
            seed: 0,
            transmitter: Some(Transmitter {
                frequency: 113_000_000.0,
                power: -20.0,
                spread_bins: 2,
                duty_cycle: 0.5,
            }),
        }
    }
}

impl GeneratorConfig {
    fn bin_count(&self) -> anyhow::Result<usize> {
        if self.freq_step <= 0.0 || self.freq_high <= self.freq_low {
            anyhow::bail!(
                "synthetic range {}..{} step {} yields no bins",
                self.freq_low,
                self.freq_high,
                self.freq_step
            );
        }
        Ok(((self.freq_high - self.freq_low) / self.freq_step).round() as usize)
    }

    fn transmitter_bin(&self) -> Option<usize> {
        let transmitter = self.transmitter.as_ref()?;
        let offset = (transmitter.frequency - self.freq_low) / self.freq_step;
        (offset >= 0.0).then(|| offset.round() as usize)
    }
}

fn start_time() -> anyhow::Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .context("building synthetic start time")
}

pub fn build_sweeps(config: &GeneratorConfig) -> anyhow::Result<Vec<SweepRecord>> {
    let bins = config.bin_count()?;
    let start = start_time()?;
    let carrier = config.transmitter_bin();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut sweeps = Vec::with_capacity(config.sweeps);
    for sweep_index in 0..config.sweeps {
        let keyed = config
            .transmitter
            .as_ref()
            .map_or(false, |tx| rng.gen_bool(tx.duty_cycle.clamp(0.0, 1.0)));

        let powers = (0..bins)
            .map(|bin| {
                if config.dropout > 0.0 && rng.gen_bool(config.dropout.clamp(0.0, 1.0)) {
                    return f64::NEG_INFINITY;
                }
                let jitter = if config.noise > 0.0 {
                    rng.gen_range(-config.noise..config.noise)
                } else {
                    0.0
                };
                match (keyed, carrier, config.transmitter.as_ref()) {
                    (true, Some(centre), Some(tx)) if bin.abs_diff(centre) <= tx.spread_bins => {
                        tx.power + jitter
                    }
                    _ => config.noise_floor + jitter,
                }
            })
            .collect();

        let stamp = start + Duration::seconds(sweep_index as i64);
        sweeps.push(SweepRecord {
            date: stamp.format("%Y-%m-%d").to_string(),
            time: stamp.format("%H:%M:%S").to_string(),
            freq_low: config.freq_low,
            freq_high: config.freq_high,
            freq_step: config.freq_step,
            sample_count: 8,
            powers,
        });
    }

    Ok(sweeps)
}

/// Synthetic sweeps rendered as rtl_power CSV lines.
pub fn build_sweep_lines(config: &GeneratorConfig) -> anyhow::Result<Vec<String>> {
    Ok(build_sweeps(config)?
        .iter()
        .map(SweepRecord::to_line)
        .collect())
}
