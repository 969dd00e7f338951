//! CAN Sniffer Library
//!
//! The core of a manual CAN signal discovery tool. Frames arrive as text lines
//! from a serial adapter, are kept in a short rolling window, and can be
//! compared against an operator-captured baseline to find the identifiers
//! whose value went up or down after a physical stimulus (pressing a button,
//! turning a knob).
//!
//! # Architecture
//!
//! - [`parser`] turns `ID:17C:00 00 01 F4` lines into [`Frame`]s and back
//! - [`window`] keeps the frames of the last second, evicting by frame time
//! - [`classifier`] reduces frame histories to the latest frame per ID and
//!   selects IDs that moved, by whole payload or by adjacent byte pair
//! - [`snapshot`] holds the baseline and exports it
//! - [`parameter`] decodes configured scaled readings from payload bytes
//! - [`engine`] owns the shared session state behind explicit locks
//! - [`transport`] defines the line source interface and the ingestion loop
//!
//! The library does NOT open serial ports, write files or draw the terminal.
//! That is the job of the application layer (can-sniffer-cli).
//!
//! # Example Usage
//!
//! ```
//! use can_sniffer::{Direction, SnifferConfig, SnifferEngine};
//!
//! let engine = SnifferEngine::new(SnifferConfig::new()).unwrap();
//! engine.ingest_line("ID:17C:00 00 01 00").unwrap();
//!
//! // Operator captures the baseline, then presses the button
//! engine.capture();
//! engine.ingest_line("ID:17C:00 00 02 00").unwrap();
//!
//! let refined = engine.classify(Direction::Increase);
//! assert_eq!(refined.frames, 1);
//! assert_eq!(refined.text, "ID:17C:00 00 02 00\n");
//! ```

// Public modules
pub mod classifier;
pub mod config;
pub mod engine;
pub mod live;
pub mod parameter;
pub mod parser;
pub mod snapshot;
pub mod transport;
pub mod types;
pub mod window;

// Re-export main types for convenience
pub use config::SnifferConfig;
pub use engine::{EngineStats, SnapshotExport, SnifferEngine};
pub use live::{LiveRow, LiveView};
pub use parameter::{Parameter, ParameterReading};
pub use transport::{run_ingestion, IngestionEnd, LineSource, ReadOutcome};
pub use types::{Comparison, Direction, Frame, Result, SnifferError, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: ensure we can create an engine
        let engine = SnifferEngine::new(SnifferConfig::new()).unwrap();
        let stats = engine.stats();
        assert_eq!(stats.buffered_frames, 0);
        assert_eq!(stats.snapshot_frames, 0);
    }
}
