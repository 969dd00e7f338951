//! Main engine API
//!
//! The `SnifferEngine` owns all mutable session state: the ingestion window,
//! the baseline snapshot and the live display projections. It is shared
//! between the ingestion, display and command threads behind an `Arc`.
//!
//! Two locks are used. The frame store lock covers the window and the
//! snapshot, so capture and classification see one consistent buffer state
//! and never a half-evicted one. The live view lock is separate, so the
//! display refresh never waits behind a classification pass.

use crate::classifier;
use crate::config::SnifferConfig;
use crate::live::{LiveRow, LiveView};
use crate::parser;
use crate::snapshot::SnapshotStore;
use crate::types::{Direction, Frame, Result};
use crate::window::FrameWindow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Frames guarded by the frame store lock
#[derive(Debug)]
struct FrameStore {
    window: FrameWindow,
    snapshot: SnapshotStore,
}

/// Result of a capture or classification pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotExport {
    /// Number of frames in the new baseline
    pub frames: usize,
    /// Exported baseline text, taken under the same lock as the update
    pub text: String,
}

/// Session counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub lines_received: u64,
    pub frames_ingested: u64,
    pub parse_failures: u64,
    pub buffered_frames: usize,
    pub snapshot_frames: usize,
}

/// The sniffer engine - entry point for all core operations
#[derive(Debug)]
pub struct SnifferEngine {
    config: SnifferConfig,
    store: Mutex<FrameStore>,
    live: Mutex<LiveView>,
    lines_received: AtomicU64,
    frames_ingested: AtomicU64,
    parse_failures: AtomicU64,
}

impl SnifferEngine {
    /// Create a new engine from a validated configuration
    ///
    /// # Example
    /// ```
    /// use can_sniffer::{SnifferConfig, SnifferEngine};
    ///
    /// let engine = SnifferEngine::new(SnifferConfig::new().add_target(0x17C)).unwrap();
    /// engine.ingest_line("ID:17C:00 00 01 F4").unwrap();
    /// assert_eq!(engine.stats().buffered_frames, 1);
    /// ```
    pub fn new(config: SnifferConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: Mutex::new(FrameStore {
                window: FrameWindow::new(config.window()),
                snapshot: SnapshotStore::new(),
            }),
            live: Mutex::new(LiveView::new()),
            config,
            lines_received: AtomicU64::new(0),
            frames_ingested: AtomicU64::new(0),
            parse_failures: AtomicU64::new(0),
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &SnifferConfig {
        &self.config
    }

    /// Parse a raw line and ingest the resulting frame
    ///
    /// # Returns
    /// * `Ok(Frame)` - the ingested frame
    /// * `Err(SnifferError)` - the line was malformed and has been discarded
    pub fn ingest_line(&self, line: &str) -> Result<Frame> {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
        match parser::parse_line(line) {
            Ok(frame) => {
                self.ingest(frame.clone());
                Ok(frame)
            }
            Err(e) => {
                self.parse_failures.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    /// Ingest an already parsed frame
    ///
    /// Appends to the window (with eviction) under the frame store lock, then
    /// updates the live projections under the live view lock.
    pub fn ingest(&self, frame: Frame) {
        log::trace!("Ingesting frame 0x{:X} ({} bytes)", frame.id(), frame.dlc());

        let tracked = self.tracks(&frame).then(|| frame.clone());
        lock(&self.store).window.ingest(frame);
        self.frames_ingested.fetch_add(1, Ordering::Relaxed);

        if let Some(frame) = tracked {
            lock(&self.live).record(&frame, &self.config);
        }
    }

    /// Capture the current window as the new baseline
    pub fn capture(&self) -> SnapshotExport {
        let mut store = lock(&self.store);
        let FrameStore { window, snapshot } = &mut *store;
        snapshot.capture(window.frames());

        log::debug!("Captured {} frames as baseline", snapshot.len());
        SnapshotExport {
            frames: snapshot.len(),
            text: snapshot.export(),
        }
    }

    /// Refine the baseline to the identifiers that moved in `direction`
    ///
    /// The classification result replaces the baseline.
    pub fn classify(&self, direction: Direction) -> SnapshotExport {
        let mut store = lock(&self.store);
        let FrameStore { window, snapshot } = &mut *store;
        let refined = classifier::classify(
            window.frames(),
            snapshot.frames(),
            direction,
            self.config.comparison,
        );
        snapshot.replace(refined);

        log::debug!(
            "Baseline refined: {} frames ({}, {})",
            snapshot.len(),
            direction,
            self.config.comparison
        );
        SnapshotExport {
            frames: snapshot.len(),
            text: snapshot.export(),
        }
    }

    /// Point-in-time copy of the ingestion window
    pub fn current_frames(&self) -> Vec<Frame> {
        lock(&self.store).window.to_vec()
    }

    /// Copy of the baseline
    pub fn snapshot(&self) -> Vec<Frame> {
        lock(&self.store).snapshot.frames().to_vec()
    }

    /// Export the baseline in its current state
    pub fn export_snapshot(&self) -> String {
        lock(&self.store).snapshot.export()
    }

    /// Copy of the live projections
    pub fn live_view(&self) -> LiveView {
        lock(&self.live).clone()
    }

    /// Live display rows: targets first, then parameters
    pub fn live_rows(&self) -> (Vec<LiveRow>, Vec<LiveRow>) {
        let live = lock(&self.live);
        (
            live.target_rows(&self.config),
            live.parameter_rows(&self.config),
        )
    }

    /// Get session statistics
    pub fn stats(&self) -> EngineStats {
        let (buffered_frames, snapshot_frames) = {
            let store = lock(&self.store);
            (store.window.len(), store.snapshot.len())
        };
        EngineStats {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            frames_ingested: self.frames_ingested.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            buffered_frames,
            snapshot_frames,
        }
    }

    fn tracks(&self, frame: &Frame) -> bool {
        self.config.is_target(frame.id()) || self.config.parameters.iter().any(|p| p.matches(frame))
    }
}

// A panic while holding a lock leaves plain data behind, still usable
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
