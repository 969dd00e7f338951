//! Parameter decoding
//!
//! A parameter is a configured extraction rule: a set of payload offsets
//! concatenated big-endian into a raw integer, then scaled by a coefficient.
//! Frames too short for the configured offsets are not an error; the
//! parameter simply has no reading for that frame.

use crate::types::{Frame, Result, SnifferError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of byte indices a parameter may concatenate (fits a u64)
pub const MAX_PARAMETER_BYTES: usize = 8;

/// A named extraction rule applied to frames of one identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Display label
    pub name: String,
    /// CAN identifier the parameter is read from
    #[serde(with = "crate::config::hex_id")]
    pub address: u32,
    /// Payload offsets, most significant first
    pub byte_indices: Vec<usize>,
    /// Scale factor applied to the raw value
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
}

fn default_coefficient() -> f64 {
    1.0
}

/// A decoded parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterReading {
    /// Concatenated bytes before scaling
    pub raw: u64,
    /// Raw value multiplied by the coefficient
    pub value: f64,
}

impl fmt::Display for ParameterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.value)
    }
}

impl Parameter {
    /// Create a new parameter
    pub fn new(
        name: impl Into<String>,
        address: u32,
        byte_indices: Vec<usize>,
        coefficient: f64,
    ) -> Self {
        Self {
            name: name.into(),
            address,
            byte_indices,
            coefficient,
        }
    }

    /// Check whether this parameter is read from the given frame's identifier
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.id() == self.address
    }

    /// Decode the parameter from a frame
    ///
    /// # Returns
    /// * `Some(ParameterReading)` if every configured index is inside the payload
    /// * `None` if the payload is too short (not applicable yet)
    pub fn decode(&self, frame: &Frame) -> Option<ParameterReading> {
        let payload = frame.payload();
        if self.byte_indices.iter().any(|&index| index >= payload.len()) {
            return None;
        }

        let raw = self
            .byte_indices
            .iter()
            .fold(0u64, |acc, &index| (acc << 8) | u64::from(payload[index]));

        Some(ParameterReading {
            raw,
            value: raw as f64 * self.coefficient,
        })
    }

    /// Validate the definition
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SnifferError::InvalidConfig(format!(
                "parameter for 0x{:X} has an empty name",
                self.address
            )));
        }
        if self.byte_indices.is_empty() || self.byte_indices.len() > MAX_PARAMETER_BYTES {
            return Err(SnifferError::InvalidConfig(format!(
                "parameter '{}' needs 1 to {} byte indices, got {}",
                self.name,
                MAX_PARAMETER_BYTES,
                self.byte_indices.len()
            )));
        }
        if !self.coefficient.is_finite() {
            return Err(SnifferError::InvalidConfig(format!(
                "parameter '{}' has a non-finite coefficient",
                self.name
            )));
        }
        Ok(())
    }
}
