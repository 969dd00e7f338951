//! Sniffer configuration types
//!
//! This module defines the configuration the core needs: the window length,
//! the comparison granularity, the target identifiers shown on the live
//! display and the optional parameter definitions. Transport and output
//! settings belong to the application layer.

use crate::parameter::Parameter;
use crate::types::{Comparison, Result, SnifferError};
use serde::{Deserialize, Serialize};

/// Configuration for the sniffer engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnifferConfig {
    /// Trailing window of the ingestion buffer in milliseconds (default: 1000ms)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Comparison granularity used by classification
    #[serde(default)]
    pub comparison: Comparison,

    /// Identifiers whose latest payload is shown on the live display
    #[serde(default, with = "hex_id_list")]
    pub targets: Vec<u32>,

    /// Optional parameter definitions decoded on every matching frame
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

fn default_window_ms() -> u64 {
    1000
}

/// Longest accepted ingestion window (one hour)
pub const MAX_WINDOW_MS: u64 = 3_600_000;

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            comparison: Comparison::default(),
            targets: Vec::new(),
            parameters: Vec::new(),
        }
    }
}

impl SnifferConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the window length
    pub fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Builder method: set the comparison granularity
    pub fn with_comparison(mut self, comparison: Comparison) -> Self {
        self.comparison = comparison;
        self
    }

    /// Builder method: add a target identifier
    pub fn add_target(mut self, id: u32) -> Self {
        self.targets.push(id);
        self
    }

    /// Builder method: add a parameter definition
    pub fn add_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Window length as a chrono duration
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(i64::try_from(self.window_ms).unwrap_or(i64::MAX))
    }

    /// Check if an identifier is shown on the live display
    pub fn is_target(&self, id: u32) -> bool {
        self.targets.contains(&id)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window_ms == 0 {
            return Err(SnifferError::InvalidConfig(
                "window_ms must be greater than zero".to_string(),
            ));
        }
        if self.window_ms > MAX_WINDOW_MS {
            return Err(SnifferError::InvalidConfig(format!(
                "window_ms must be at most {} (got {})",
                MAX_WINDOW_MS, self.window_ms
            )));
        }
        for parameter in &self.parameters {
            parameter.validate()?;
        }
        let mut names: Vec<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(SnifferError::InvalidConfig(format!(
                "duplicate parameter name '{}'",
                pair[0]
            )));
        }
        Ok(())
    }
}

/// Serde helper: a CAN identifier written as a hex string (`"17C"`)
pub mod hex_id {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(id: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:X}", id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let text = String::deserialize(deserializer)?;
        crate::parser::parse_hex_u32(text.trim())
            .ok_or_else(|| de::Error::custom(format!("invalid hex CAN identifier {:?}", text)))
    }
}

/// Serde helper: a list of hex string identifiers
pub mod hex_id_list {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ids: &[u32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(ids.iter().map(|id| format!("{:X}", id)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|text| {
                crate::parser::parse_hex_u32(text.trim()).ok_or_else(|| {
                    de::Error::custom(format!("invalid hex CAN identifier {:?}", text))
                })
            })
            .collect()
    }
}
