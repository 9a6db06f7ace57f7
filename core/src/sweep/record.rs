use crate::prelude::ParseError;
use serde::{Deserialize, Serialize};

const HEADER_FIELDS: usize = 6;

/// One rtl_power sweep: `date, time, Hz low, Hz high, Hz step, samples, dB, dB, ...`.
///
/// The frequency of bin `n` is `freq_low + n * freq_step`. The number of
/// `powers` is taken as given; it is not checked against the frequency range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub date: String,
    pub time: String,
    pub freq_low: f64,
    pub freq_high: f64,
    pub freq_step: f64,
    pub sample_count: u64,
    pub powers: Vec<f64>,
}

impl SweepRecord {
    /// Parses one CSV line. Fields are trimmed, so both `,` and `, ` separated
    /// lines are accepted, as is a trailing newline. `-inf` is a valid reading.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        if fields.len() < HEADER_FIELDS {
            return Err(ParseError::TooFewFields {
                found: fields.len(),
            });
        }

        let powers = fields[HEADER_FIELDS..]
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let raw = raw.trim();
                raw.parse::<f64>().map_err(|_| ParseError::InvalidPower {
                    index,
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            date: fields[0].trim().to_string(),
            time: fields[1].trim().to_string(),
            freq_low: parse_header(fields[2], "freq_low")?,
            freq_high: parse_header(fields[3], "freq_high")?,
            freq_step: parse_header(fields[4], "freq_step")?,
            sample_count: parse_header(fields[5], "sample_count")?,
            powers,
        })
    }

    /// Date and time joined for display.
    pub fn timestamp(&self) -> String {
        format!("{} {}", self.date, self.time)
    }

    pub fn bin_frequency(&self, index: usize) -> f64 {
        self.freq_low + self.freq_step * index as f64
    }

    /// Bin count implied by the frequency range; informational only.
    pub fn expected_bins(&self) -> Option<usize> {
        if self.freq_step > 0.0 && self.freq_high >= self.freq_low {
            Some(((self.freq_high - self.freq_low) / self.freq_step).round() as usize)
        } else {
            None
        }
    }

    /// Renders the record in rtl_power's `, ` separated form.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{}, {}, {}, {}, {}, {}",
            self.date, self.time, self.freq_low, self.freq_high, self.freq_step, self.sample_count
        );
        for power in &self.powers {
            line.push_str(&format!(", {:.2}", power));
        }
        line
    }
}

fn parse_header<T: std::str::FromStr>(raw: &str, field: &'static str) -> Result<T, ParseError> {
    let raw = raw.trim();
    raw.parse::<T>().map_err(|_| ParseError::InvalidHeader {
        field,
        value: raw.to_string(),
    })
}
