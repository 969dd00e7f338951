//! Time-windowed ingestion buffer
//!
//! Holds the frames of the last `window` in arrival order. Eviction is
//! measured against the timestamp of the frame just inserted rather than the
//! wall clock, so replaying a timestamped stream produces the same buffer.

use crate::types::Frame;
use chrono::Duration;
use std::collections::VecDeque;

/// Rolling buffer of recent frames
#[derive(Debug, Clone)]
pub struct FrameWindow {
    frames: VecDeque<Frame>,
    window: Duration,
}

impl FrameWindow {
    /// Create an empty buffer with the given trailing window
    pub fn new(window: Duration) -> Self {
        Self {
            frames: VecDeque::new(),
            window,
        }
    }

    /// Append a frame, then evict every frame older than `frame.timestamp - window`
    ///
    /// Returns the number of evicted frames.
    pub fn ingest(&mut self, frame: Frame) -> usize {
        // A window reaching past the representable time range evicts nothing
        let threshold = frame.timestamp().checked_sub_signed(self.window);
        self.frames.push_back(frame);
        let Some(threshold) = threshold else {
            return 0;
        };

        // Arrival order is chronological, so stale frames form a prefix
        let stale = self
            .frames
            .iter()
            .take_while(|f| f.timestamp() < threshold)
            .count();
        self.frames.drain(..stale);

        if stale > 0 {
            log::trace!("Evicted {} frames older than {}", stale, threshold);
        }
        stale
    }

    /// Frames in arrival order, oldest first
    pub fn frames(&self) -> impl DoubleEndedIterator<Item = &Frame> + ExactSizeIterator {
        self.frames.iter()
    }

    /// Point-in-time copy of the buffer
    pub fn to_vec(&self) -> Vec<Frame> {
        self.frames.iter().cloned().collect()
    }

    /// Number of buffered frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if no frames are buffered
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Configured window length
    pub fn window(&self) -> Duration {
        self.window
    }
}
