//! The run-identifying tag record.
//!
//! A single tag entity is written to the store at reset, encoding the
//! model name, reset variant, population size, run length and run number
//! as `spec_reset_pop_len_run`. Subsystems read it back mid-run to
//! recover the population size and run length without carrying them in
//! their own configuration.

use serde::{Deserialize, Serialize};

/// Error parsing a stored tag string.
#[derive(Debug, thiserror::Error)]
pub enum TagParseError {
    /// The tag did not contain the expected five fields.
    #[error("malformed run tag: {tag:?}")]
    Malformed {
        /// The offending tag string.
        tag: String,
    },
    /// A numeric field failed to parse.
    #[error("non-numeric field {field} in run tag {tag:?}")]
    NonNumeric {
        /// The field that failed.
        field: &'static str,
        /// The offending tag string.
        tag: String,
    },
}

/// A parsed run tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTag {
    /// Model specification name.
    pub spec_name: String,
    /// Reset variant label describing the starting conditions.
    pub reset_name: String,
    /// Initial (and maintained) population size.
    pub pop_size: u64,
    /// Number of generations in the run.
    pub run_length: u64,
    /// Which run of the batch this is.
    pub run_number: u64,
}

impl RunTag {
    /// Format the tag in its stored `spec_reset_pop_len_run` form.
    pub fn format(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}",
            self.spec_name, self.reset_name, self.pop_size, self.run_length, self.run_number
        )
    }

    /// Parse a stored tag. The spec name may itself contain underscores;
    /// the four trailing fields are fixed, so parsing splits from the
    /// right.
    pub fn parse(tag: &str) -> Result<Self, TagParseError> {
        let mut parts = tag.rsplitn(5, '_');
        let run_number = next_numeric(&mut parts, "run_number", tag)?;
        let run_length = next_numeric(&mut parts, "run_length", tag)?;
        let pop_size = next_numeric(&mut parts, "pop_size", tag)?;
        let reset_name = parts
            .next()
            .ok_or_else(|| TagParseError::Malformed {
                tag: tag.to_owned(),
            })?
            .to_owned();
        let spec_name = parts
            .next()
            .ok_or_else(|| TagParseError::Malformed {
                tag: tag.to_owned(),
            })?
            .to_owned();
        Ok(Self {
            spec_name,
            reset_name,
            pop_size,
            run_length,
            run_number,
        })
    }
}

fn next_numeric(
    parts: &mut core::str::RSplitN<'_, char>,
    field: &'static str,
    tag: &str,
) -> Result<u64, TagParseError> {
    let raw = parts.next().ok_or_else(|| TagParseError::Malformed {
        tag: tag.to_owned(),
    })?;
    raw.parse::<u64>().map_err(|_| TagParseError::NonNumeric {
        field,
        tag: tag.to_owned(),
    })
}

impl core::fmt::Display for RunTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format())
    }
}
