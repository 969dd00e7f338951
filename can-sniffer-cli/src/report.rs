//! Snapshot export files
//!
//! One file per capture or classification pass, named after the moment it was
//! written. Millisecond precision keeps two passes in the same second apart.

use anyhow::{Context, Result};
use can_sniffer::SnapshotExport;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot file name for an export written at `at`
pub fn snapshot_file_name(at: DateTime<Local>) -> String {
    format!("snapshot_{}.txt", at.format("%Y%m%d_%H%M%S_%3f"))
}

/// Write an exported baseline into `dir`
pub fn write_snapshot(dir: &Path, export: &SnapshotExport, at: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let path = unique_path(dir, &snapshot_file_name(at));
    fs::write(&path, &export.text)
        .with_context(|| format!("Failed to write snapshot file: {:?}", path))?;

    log::debug!("Wrote {} frames to {:?}", export.frames, path);
    Ok(path)
}

// Two passes in the same millisecond get a numbered suffix
fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    if !path.exists() {
        return path;
    }
    let stem = file_name.trim_end_matches(".txt");
    (1..)
        .map(|n| dir.join(format!("{}_{}.txt", stem, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(path)
}
