//! Line transport interface and the ingestion loop
//!
//! The transport hands the core one raw text line at a time. Instead of
//! signalling "nothing yet" through an error, it returns an explicit
//! [`ReadOutcome`], so the ingestion loop can tell an idle link from a real
//! read failure without inspecting error text.

use crate::engine::SnifferEngine;
use crate::types::Result;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Pause after an idle read or a read failure (default: 2ms)
pub const DEFAULT_IDLE_PAUSE: Duration = Duration::from_millis(2);

/// Outcome of one read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line as received, without the trailing `\n`
    Line(Vec<u8>),
    /// No complete line available yet
    Idle,
    /// The source is exhausted and will not produce more lines
    Closed,
}

impl ReadOutcome {
    /// Line outcome from text
    pub fn line(text: impl Into<String>) -> Self {
        ReadOutcome::Line(text.into().into_bytes())
    }
}

/// A source of raw frame lines (serial port, recorded transcript, ...)
pub trait LineSource: Send {
    /// Read the next line, blocking at most for the source's read timeout
    ///
    /// An `Err` is a hard read failure. It is reported by the caller, who
    /// may keep reading.
    fn read_line(&mut self) -> Result<ReadOutcome>;

    /// Release the underlying resource
    fn close(&mut self) {}
}

/// Why the ingestion loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionEnd {
    /// The shutdown flag was raised
    Cancelled,
    /// The source reported [`ReadOutcome::Closed`]
    SourceClosed,
}

/// Run the ingestion loop until shutdown or until the source closes
///
/// Every received line is written byte for byte to `transcript` and flushed
/// before it is decoded and parsed. Malformed lines are logged and skipped,
/// read failures are logged and followed by a short pause. Nothing here stops the loop except
/// the shutdown flag or a closed source.
pub fn run_ingestion<S>(
    source: &mut S,
    engine: &SnifferEngine,
    transcript: &mut dyn Write,
    shutdown: &AtomicBool,
    idle_pause: Duration,
) -> IngestionEnd
where
    S: LineSource + ?Sized,
{
    log::debug!("Ingestion loop started");

    let end = loop {
        if shutdown.load(Ordering::SeqCst) {
            break IngestionEnd::Cancelled;
        }

        match source.read_line() {
            Ok(ReadOutcome::Line(raw)) => {
                if let Err(e) = write_transcript(transcript, &raw) {
                    log::error!("Failed to write transcript: {}", e);
                }

                let line = String::from_utf8_lossy(&raw);
                if let Err(e) = engine.ingest_line(&line) {
                    if e.is_parse_error() {
                        log::warn!("Failed to parse frame: {}", e);
                    } else {
                        log::error!("Failed to ingest line: {}", e);
                    }
                }
            }
            Ok(ReadOutcome::Idle) => std::thread::sleep(idle_pause),
            Ok(ReadOutcome::Closed) => break IngestionEnd::SourceClosed,
            Err(e) => {
                log::error!("Read error: {}", e);
                std::thread::sleep(idle_pause);
            }
        }
    };

    source.close();
    if end == IngestionEnd::SourceClosed {
        log::info!("Line source closed, no more frames will arrive");
    }
    log::debug!("Ingestion loop stopped: {:?}", end);
    end
}

fn write_transcript(transcript: &mut dyn Write, raw: &[u8]) -> std::io::Result<()> {
    transcript.write_all(raw)?;
    transcript.write_all(b"\n")?;
    transcript.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SnifferConfig;
    use crate::types::SnifferError;
    use std::collections::VecDeque;

    /// Scripted source; raises the shutdown flag once the script runs out
    struct ScriptedSource<'a> {
        script: VecDeque<Result<ReadOutcome>>,
        shutdown: Option<&'a AtomicBool>,
        closed: bool,
    }

    impl<'a> ScriptedSource<'a> {
        fn new(script: Vec<Result<ReadOutcome>>, shutdown: Option<&'a AtomicBool>) -> Self {
            Self {
                script: script.into(),
                shutdown,
                closed: false,
            }
        }
    }

    impl LineSource for ScriptedSource<'_> {
        fn read_line(&mut self) -> Result<ReadOutcome> {
            match self.script.pop_front() {
                Some(outcome) => outcome,
                None => {
                    if let Some(flag) = self.shutdown {
                        flag.store(true, Ordering::SeqCst);
                    }
                    Ok(ReadOutcome::Idle)
                }
            }
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn line(text: &str) -> Result<ReadOutcome> {
        Ok(ReadOutcome::line(text))
    }

    #[test]
    fn test_ingests_lines_until_source_closes() {
        let engine = SnifferEngine::new(SnifferConfig::new()).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut transcript = Vec::new();
        let mut source = ScriptedSource::new(
            vec![
                line("ID:17C:00 01"),
                Ok(ReadOutcome::Idle),
                line("bad:line"),
                Err(SnifferError::Transport("device hiccup".to_string())),
                line("ID:136:FF"),
                Ok(ReadOutcome::Closed),
                line("ID:999:00"),
            ],
            None,
        );

        let end = run_ingestion(&mut source, &engine, &mut transcript, &shutdown, Duration::ZERO);

        assert_eq!(end, IngestionEnd::SourceClosed);
        assert!(source.closed);
        let stats = engine.stats();
        assert_eq!(stats.lines_received, 3);
        assert_eq!(stats.frames_ingested, 2);
        assert_eq!(stats.parse_failures, 1);
        assert_eq!(
            String::from_utf8(transcript).unwrap(),
            "ID:17C:00 01\nbad:line\nID:136:FF\n"
        );
    }

    #[test]
    fn test_transcript_keeps_raw_bytes() {
        let engine = SnifferEngine::new(SnifferConfig::new()).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut transcript = Vec::new();
        let mut source = ScriptedSource::new(
            vec![
                Ok(ReadOutcome::Line(b"ID:17C:00 01\r".to_vec())),
                Ok(ReadOutcome::Line(b"ID:\xFF:01".to_vec())),
                Ok(ReadOutcome::Closed),
            ],
            None,
        );

        run_ingestion(&mut source, &engine, &mut transcript, &shutdown, Duration::ZERO);

        assert_eq!(transcript, b"ID:17C:00 01\r\nID:\xFF:01\n".to_vec());
        let stats = engine.stats();
        assert_eq!(stats.frames_ingested, 1);
        assert_eq!(stats.parse_failures, 1);
    }

    #[test]
    fn test_stops_on_shutdown_flag() {
        let engine = SnifferEngine::new(SnifferConfig::new()).unwrap();
        let shutdown = AtomicBool::new(false);
        let mut source = ScriptedSource::new(vec![line("ID:1:01")], Some(&shutdown));

        let end = run_ingestion(&mut source, &engine, &mut std::io::sink(), &shutdown, Duration::ZERO);

        assert_eq!(end, IngestionEnd::Cancelled);
        assert!(source.closed);
        assert_eq!(engine.stats().frames_ingested, 1);
    }

    #[test]
    fn test_raised_flag_stops_before_reading() {
        let engine = SnifferEngine::new(SnifferConfig::new()).unwrap();
        let shutdown = AtomicBool::new(true);
        let mut source = ScriptedSource::new(vec![line("ID:1:01")], None);

        let end = run_ingestion(&mut source, &engine, &mut std::io::sink(), &shutdown, Duration::ZERO);

        assert_eq!(end, IngestionEnd::Cancelled);
        assert_eq!(engine.stats().lines_received, 0);
    }
}
