//! Baseline snapshot store
//!
//! The snapshot is an owned copy of frames, never a view into the ingestion
//! buffer, which keeps evolving after a capture.

use crate::parser::format_line;
use crate::types::Frame;

/// Operator-captured or classification-refined baseline
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    frames: Vec<Frame>,
}

impl SnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline with a full copy of the given frames
    ///
    /// The raw history is kept (not the reduced form) so later classification
    /// passes still see whichever frame was latest per identifier.
    pub fn capture<'a, I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        self.frames = frames.into_iter().cloned().collect();
    }

    /// Replace the baseline with a classification result
    pub fn replace(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
    }

    /// Baseline frames in stored order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of stored frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True if nothing has been captured
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Serialise the baseline, one `ID:<id>:<bytes>` line per frame
    pub fn export(&self) -> String {
        self.frames
            .iter()
            .map(|frame| format_line(frame) + "\n")
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use chrono::Utc;

    fn frame(id: u32, payload: &[u8]) -> Frame {
        Frame::new(id, payload.to_vec(), Utc::now())
    }

    #[test]
    fn test_capture_copies_full_history() {
        let history = vec![frame(0x17C, &[1]), frame(0x136, &[2]), frame(0x17C, &[3])];
        let mut store = SnapshotStore::new();
        store.capture(&history);
        assert_eq!(store.len(), 3);
        assert_eq!(store.frames(), history.as_slice());
    }

    #[test]
    fn test_capture_replaces_previous_baseline() {
        let mut store = SnapshotStore::new();
        store.capture(&[frame(0x100, &[1]), frame(0x200, &[2])]);
        store.capture(&[frame(0x300, &[3])]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.frames()[0].id(), 0x300);

        store.replace(Vec::new());
        assert!(store.is_empty());
    }

    #[test]
    fn test_export_format() {
        let mut store = SnapshotStore::new();
        store.capture(&[frame(0x17C, &[0x00, 0x00, 0x01, 0xF4]), frame(0x7, &[0xAB])]);
        assert_eq!(store.export(), "ID:17C:00 00 01 F4\nID:7:AB\n");
        assert_eq!(SnapshotStore::new().export(), "");
    }

    #[test]
    fn test_export_parses_back() {
        let mut store = SnapshotStore::new();
        store.capture(&[frame(0x1DC, &[0xDE, 0xAD]), frame(0x13A, &[])]);
        let parsed: Vec<Frame> = store
            .export()
            .lines()
            .map(|line| parse_line(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        for (written, parsed) in store.frames().iter().zip(&parsed) {
            assert_eq!(written.id(), parsed.id());
            assert_eq!(written.payload(), parsed.payload());
        }
    }
}
