//! Last-seen projections for the live display
//!
//! Two groups are kept: the latest payload of each target identifier and the
//! latest reading of each configured parameter. Both are display text only;
//! classification never reads them.

use crate::config::SnifferConfig;
use crate::types::Frame;
use std::collections::HashMap;

/// Placeholder shown for keys that have not been seen yet
pub const NO_DATA: &str = "no data";

/// Live display state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveView {
    targets: HashMap<u32, String>,
    parameters: HashMap<String, String>,
}

/// One rendered display row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRow {
    pub label: String,
    pub value: String,
}

impl LiveView {
    /// Create an empty view
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the projections from one ingested frame
    ///
    /// Returns true if anything changed.
    pub fn record(&mut self, frame: &Frame, config: &SnifferConfig) -> bool {
        let mut updated = false;

        if config.is_target(frame.id()) {
            self.targets.insert(frame.id(), format_decimal(frame.payload()));
            updated = true;
        }

        for parameter in config.parameters.iter().filter(|p| p.matches(frame)) {
            if let Some(reading) = parameter.decode(frame) {
                log::trace!("{} = {} (raw {})", parameter.name, reading, reading.raw);
                self.parameters.insert(parameter.name.clone(), reading.to_string());
                updated = true;
            }
        }

        updated
    }

    /// Latest payload text for a target identifier
    pub fn target(&self, id: u32) -> Option<&str> {
        self.targets.get(&id).map(String::as_str)
    }

    /// Latest reading text for a parameter
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    /// Target rows in configured order
    pub fn target_rows(&self, config: &SnifferConfig) -> Vec<LiveRow> {
        config
            .targets
            .iter()
            .map(|&id| LiveRow {
                label: format!("{:X}", id),
                value: self.target(id).unwrap_or(NO_DATA).to_string(),
            })
            .collect()
    }

    /// Parameter rows in configured order
    pub fn parameter_rows(&self, config: &SnifferConfig) -> Vec<LiveRow> {
        config
            .parameters
            .iter()
            .map(|p| LiveRow {
                label: p.name.clone(),
                value: self.parameter(&p.name).unwrap_or(NO_DATA).to_string(),
            })
            .collect()
    }
}

/// Payload bytes as decimal values separated by spaces
fn format_decimal(payload: &[u8]) -> String {
    payload
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
