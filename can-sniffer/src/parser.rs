//! Text line codec for CAN frames
//!
//! The serial adapter emits one frame per line in the form
//! `<tag>:<id-hex>:<byte-hex> <byte-hex> ...`, for example
//! `ID:17C:00 00 01 F4`. The tag is ignored on read. Snapshot exports use the
//! same shape with the `ID` tag, so exported files can be parsed back.

use crate::types::{Frame, Result, SnifferError, Timestamp};
use chrono::Utc;
use std::fmt::Write;

/// Tag written in front of exported frame lines
pub const EXPORT_TAG: &str = "ID";

/// Parse a raw line, stamping the frame with the current time
pub fn parse_line(line: &str) -> Result<Frame> {
    parse_line_at(line, Utc::now())
}

/// Parse a raw line with an explicit arrival timestamp
pub fn parse_line_at(line: &str, timestamp: Timestamp) -> Result<Frame> {
    let line = line.trim();
    let fields: Vec<&str> = line.split(':').collect();
    if fields.len() != 3 {
        return Err(SnifferError::FieldCount {
            line: line.to_string(),
            found: fields.len(),
        });
    }

    let id_token = fields[1].trim();
    let id = parse_hex_u32(id_token).ok_or_else(|| SnifferError::InvalidIdentifier {
        line: line.to_string(),
        token: id_token.to_string(),
    })?;

    let payload = fields[2]
        .split_whitespace()
        .map(|token| {
            parse_hex_u8(token).ok_or_else(|| SnifferError::InvalidByte {
                line: line.to_string(),
                token: token.to_string(),
            })
        })
        .collect::<Result<Vec<u8>>>()?;

    Ok(Frame::new(id, payload, timestamp))
}

/// Format a frame as an export line: `ID:17C:00 00 01 F4`
///
/// The identifier is uppercase hex without leading zeros, each payload byte
/// is two-digit uppercase hex.
pub fn format_line(frame: &Frame) -> String {
    let mut line = format!("{}:{:X}:", EXPORT_TAG, frame.id());
    for (i, byte) in frame.payload().iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        // Writing to a String cannot fail
        let _ = write!(line, "{:02X}", byte);
    }
    line
}

/// Parse a hexadecimal identifier such as `"17C"` (case-insensitive)
pub fn parse_hex_u32(token: &str) -> Option<u32> {
    if !is_hex_token(token) {
        return None;
    }
    u32::from_str_radix(token, 16).ok()
}

fn parse_hex_u8(token: &str) -> Option<u8> {
    if !is_hex_token(token) {
        return None;
    }
    u8::from_str_radix(token, 16).ok()
}

// from_str_radix accepts a leading '+', the wire format does not
fn is_hex_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_hexdigit())
}
