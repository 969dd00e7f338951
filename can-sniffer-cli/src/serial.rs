//! Line sources: serial port and recorded transcript replay
//!
//! Both wrap a byte reader in a line assembler. A serial read timeout yields
//! `ReadOutcome::Idle` and keeps any partial line for the next call, so a
//! frame split across two reads is never lost. Lines are handed on as raw
//! bytes; decoding happens after the transcript has them.

use anyhow::{Context, Result};
use can_sniffer::{LineSource, ReadOutcome, SnifferError};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Longest unterminated input kept while waiting for `\n`
///
/// Adapter lines are well under 40 bytes; anything longer is line noise.
pub const MAX_LINE_BYTES: usize = 512;

/// What a zero-length read means for the underlying reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndOfInput {
    /// Nothing available yet (serial port)
    Idle,
    /// Input exhausted (file)
    Closed,
}

/// Assembles newline-terminated lines from a byte reader
pub struct ReaderLineSource<R> {
    reader: Option<R>,
    label: String,
    pending: Vec<u8>,
    end_of_input: EndOfInput,
    line_interval: Duration,
}

/// Serial adapter line source
pub type SerialLineSource = ReaderLineSource<Box<dyn serialport::SerialPort>>;

/// Recorded transcript line source
pub type ReplayLineSource = ReaderLineSource<BufReader<File>>;

/// Open a serial port as a line source
pub fn open_serial(port: &str, baud_rate: u32, read_timeout: Duration) -> Result<SerialLineSource> {
    log::info!("Opening serial port: {} at {} bps", port, baud_rate);

    let serial = serialport::new(port, baud_rate)
        .timeout(read_timeout)
        .open()
        .with_context(|| format!("Failed to open serial port {}", port))?;

    Ok(ReaderLineSource::new(serial, port, EndOfInput::Idle))
}

/// Open a recorded transcript for replay
pub fn open_replay(path: &Path, line_interval: Duration) -> Result<ReplayLineSource> {
    log::info!("Replaying transcript: {:?}", path);

    let file = File::open(path).with_context(|| format!("Failed to open transcript {:?}", path))?;
    let mut source = ReaderLineSource::new(
        BufReader::new(file),
        &path.display().to_string(),
        EndOfInput::Closed,
    );
    source.line_interval = line_interval;
    Ok(source)
}

impl<R: Read> ReaderLineSource<R> {
    fn new(reader: R, label: &str, end_of_input: EndOfInput) -> Self {
        Self {
            reader: Some(reader),
            label: label.to_string(),
            pending: Vec::new(),
            end_of_input,
            line_interval: Duration::ZERO,
        }
    }

    /// Take one complete line out of the pending bytes, dropping its `\n`
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut raw: Vec<u8> = self.pending.drain(..=end).collect();
        raw.pop();
        Some(raw)
    }
}

impl<R: Read + Send> LineSource for ReaderLineSource<R> {
    fn read_line(&mut self) -> can_sniffer::Result<ReadOutcome> {
        let mut chunk = [0u8; 256];
        loop {
            if let Some(line) = self.take_line() {
                if !self.line_interval.is_zero() {
                    std::thread::sleep(self.line_interval);
                }
                return Ok(ReadOutcome::Line(line));
            }

            let Some(reader) = self.reader.as_mut() else {
                return Ok(ReadOutcome::Closed);
            };

            match reader.read(&mut chunk) {
                Ok(0) => {
                    if self.end_of_input == EndOfInput::Idle {
                        return Ok(ReadOutcome::Idle);
                    }
                    // Last line of a file may lack its terminator
                    self.reader = None;
                    if self.pending.is_empty() {
                        return Ok(ReadOutcome::Closed);
                    }
                    return Ok(ReadOutcome::Line(std::mem::take(&mut self.pending)));
                }
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if self.pending.len() > MAX_LINE_BYTES && !self.pending.contains(&b'\n') {
                        let dropped = self.pending.len();
                        self.pending.clear();
                        return Err(SnifferError::Transport(format!(
                            "{}: {} bytes without a line terminator, discarded",
                            self.label, dropped
                        )));
                    }
                }
                Err(e) if is_idle(&e) => return Ok(ReadOutcome::Idle),
                Err(e) => {
                    return Err(SnifferError::Transport(format!("{}: {}", self.label, e)));
                }
            }
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            log::debug!("Closed line source {}", self.label);
        }
    }
}

/// Read errors that only mean "no data yet"
fn is_idle(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
