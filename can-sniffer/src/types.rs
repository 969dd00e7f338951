//! Core types for the CAN sniffer library
//!
//! This module defines the frame entity every other component works on, the
//! comparison selectors used by the classifier, and the library error type.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Result type for library operations
pub type Result<T> = std::result::Result<T, SnifferError>;

/// A parsed CAN frame as received over the serial link
///
/// Frames are immutable once constructed. The timestamp is the arrival time
/// assigned by the parser and is only meaningful relative to other frames of
/// the same session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    id: u32,
    payload: Vec<u8>,
    timestamp: Timestamp,
}

impl Frame {
    /// Create a new frame
    pub fn new(id: u32, payload: Vec<u8>, timestamp: Timestamp) -> Self {
        Self {
            id,
            payload,
            timestamp,
        }
    }

    /// CAN identifier
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Payload bytes in wire order
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Arrival timestamp
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Get the data length code (DLC) - number of payload bytes
    pub fn dlc(&self) -> usize {
        self.payload.len()
    }

    /// Whole payload as a big-endian integer
    ///
    /// Returns `None` when the payload has more than eight significant bytes
    /// and the value does not fit in a `u64`. Use [`Frame::cmp_whole_value`]
    /// for comparisons, which is exact for any payload length.
    pub fn whole_value(&self) -> Option<u64> {
        let significant = strip_leading_zeros(&self.payload);
        match significant.len() {
            0 => Some(0),
            n if n <= 8 => Some(BigEndian::read_uint(significant, n)),
            _ => None,
        }
    }

    /// Compare the big-endian whole values of two payloads
    pub fn cmp_whole_value(&self, other: &Frame) -> Ordering {
        let lhs = strip_leading_zeros(&self.payload);
        let rhs = strip_leading_zeros(&other.payload);
        lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
    }

    /// Number of adjacent byte-pair positions in the payload
    pub fn pair_count(&self) -> usize {
        self.payload.len().saturating_sub(1)
    }

    /// Big-endian 16-bit value of `payload[index]` and `payload[index + 1]`
    ///
    /// # Panics
    /// Panics if `index + 1` is not a valid payload offset. Callers must stay
    /// within [`Frame::pair_count`].
    pub fn byte_pair(&self, index: usize) -> u16 {
        assert!(
            index < self.pair_count(),
            "byte pair index {} out of range for frame 0x{:X} with {} payload bytes",
            index,
            self.id,
            self.payload.len()
        );
        BigEndian::read_u16(&self.payload[index..index + 2])
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Direction of change selected by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Current value strictly greater than the baseline
    Increase,
    /// Current value strictly less than the baseline
    Decrease,
}

impl Direction {
    /// Check whether `current.cmp(&baseline)` moved in this direction
    pub fn admits(self, ordering: Ordering) -> bool {
        match self {
            Direction::Increase => ordering == Ordering::Greater,
            Direction::Decrease => ordering == Ordering::Less,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Increase => write!(f, "increased"),
            Direction::Decrease => write!(f, "decreased"),
        }
    }
}

/// Granularity of the differential comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Compare the whole payload as one big-endian integer
    #[default]
    WholeValue,
    /// Compare adjacent byte pairs; the first moving pair selects the frame
    BytePair,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::WholeValue => write!(f, "whole-value"),
            Comparison::BytePair => write!(f, "byte-pair"),
        }
    }
}

/// Errors that can occur in the sniffer library
#[derive(Debug, thiserror::Error)]
pub enum SnifferError {
    #[error("Expected 3 colon-separated fields, found {found}: {line:?}")]
    FieldCount { line: String, found: usize },

    #[error("Invalid CAN identifier {token:?}: {line:?}")]
    InvalidIdentifier { line: String, token: String },

    #[error("Invalid payload byte {token:?}: {line:?}")]
    InvalidByte { line: String, token: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl SnifferError {
    /// True for errors produced by the frame parser
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            SnifferError::FieldCount { .. }
                | SnifferError::InvalidIdentifier { .. }
                | SnifferError::InvalidByte { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &[u8]) -> Frame {
        Frame::new(0x17C, payload.to_vec(), Utc::now())
    }

    #[test]
    fn test_whole_value_big_endian() {
        assert_eq!(frame(&[0x00, 0x00, 0x01, 0xF4]).whole_value(), Some(500));
        assert_eq!(frame(&[0x12, 0x34]).whole_value(), Some(0x1234));
        assert_eq!(frame(&[]).whole_value(), Some(0));
        assert_eq!(frame(&[0; 12]).whole_value(), Some(0));
        assert_eq!(frame(&[1; 9]).whole_value(), None);
    }

    #[test]
    fn test_cmp_whole_value_ignores_leading_zeros() {
        let short = frame(&[0x02]);
        let long = frame(&[0x00, 0x00, 0x01]);
        assert_eq!(short.cmp_whole_value(&long), Ordering::Greater);

        let baseline = frame(&[0x00, 0x00, 0x01, 0x00]);
        let current = frame(&[0x00, 0x00, 0x02, 0x00]);
        assert_eq!(current.cmp_whole_value(&baseline), Ordering::Greater);
        assert_eq!(baseline.cmp_whole_value(&current), Ordering::Less);
        assert_eq!(current.cmp_whole_value(&current.clone()), Ordering::Equal);
    }

    #[test]
    fn test_cmp_whole_value_beyond_u64() {
        let mut big = vec![0xFF; 10];
        let lower = frame(&big);
        big[9] = 0xFE;
        assert_eq!(frame(&big).cmp_whole_value(&lower), Ordering::Less);
    }

    #[test]
    fn test_byte_pair() {
        let f = frame(&[0x01, 0x02, 0x03]);
        assert_eq!(f.pair_count(), 2);
        assert_eq!(f.byte_pair(0), 0x0102);
        assert_eq!(f.byte_pair(1), 0x0203);
        assert_eq!(frame(&[0x01]).pair_count(), 0);
        assert_eq!(frame(&[]).pair_count(), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_byte_pair_out_of_range_panics() {
        frame(&[0x01, 0x02]).byte_pair(1);
    }

    #[test]
    fn test_direction_admits() {
        assert!(Direction::Increase.admits(Ordering::Greater));
        assert!(!Direction::Increase.admits(Ordering::Equal));
        assert!(Direction::Decrease.admits(Ordering::Less));
        assert!(!Direction::Decrease.admits(Ordering::Greater));
    }

    #[test]
    fn test_error_classification() {
        let err = SnifferError::FieldCount {
            line: "bad:line".to_string(),
            found: 2,
        };
        assert!(err.is_parse_error());
        assert!(!SnifferError::Transport("gone".to_string()).is_parse_error());
    }
}
