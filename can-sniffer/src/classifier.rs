//! Latest-per-ID reduction and differential classification
//!
//! Classification compares the most recent frame per identifier in the
//! current buffer against the most recent frame per identifier in the
//! baseline, and keeps the identifiers whose value moved in the requested
//! direction. Identifiers seen on only one side have nothing to compare
//! against and are left out.

use crate::types::{Comparison, Direction, Frame};
use std::collections::HashMap;

/// Collapse a frame history into the most recent frame per identifier
///
/// Scans newest to oldest, so the frame with the greatest arrival index wins
/// regardless of where earlier occurrences sit in the sequence.
pub fn latest_per_id<'a, I>(frames: I) -> HashMap<u32, &'a Frame>
where
    I: IntoIterator<Item = &'a Frame>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut latest = HashMap::new();
    for frame in frames.into_iter().rev() {
        latest.entry(frame.id()).or_insert(frame);
    }
    latest
}

/// Select the current frames whose value moved in `direction` against the baseline
///
/// The result holds one frame per selected identifier, ordered by identifier.
pub fn classify<'a, C, B>(
    current: C,
    baseline: B,
    direction: Direction,
    comparison: Comparison,
) -> Vec<Frame>
where
    C: IntoIterator<Item = &'a Frame>,
    C::IntoIter: DoubleEndedIterator,
    B: IntoIterator<Item = &'a Frame>,
    B::IntoIter: DoubleEndedIterator,
{
    let current_latest = latest_per_id(current);
    let baseline_latest = latest_per_id(baseline);

    let mut selected: Vec<Frame> = current_latest
        .iter()
        .filter_map(|(id, &current_frame)| {
            let baseline_frame = baseline_latest.get(id)?;
            let moved = match comparison {
                Comparison::WholeValue => whole_value_moved(current_frame, baseline_frame, direction),
                Comparison::BytePair => byte_pair_moved(current_frame, baseline_frame, direction),
            };
            moved.then(|| current_frame.clone())
        })
        .collect();

    selected.sort_by_key(Frame::id);
    log::debug!(
        "{} classification ({}): {} of {} identifiers selected",
        comparison,
        direction,
        selected.len(),
        current_latest.len()
    );
    selected
}

/// Whole-payload comparison; equal values never move
pub fn whole_value_moved(current: &Frame, baseline: &Frame, direction: Direction) -> bool {
    direction.admits(current.cmp_whole_value(baseline))
}

/// Byte-pair comparison; the first pair position that moved decides
///
/// Only positions present in both payloads are compared.
pub fn byte_pair_moved(current: &Frame, baseline: &Frame, direction: Direction) -> bool {
    let positions = current.pair_count().min(baseline.pair_count());
    (0..positions).any(|i| direction.admits(current.byte_pair(i).cmp(&baseline.byte_pair(i))))
}
