//! Raw line transcript
//!
//! Every line received from the adapter is appended verbatim. The ingestion
//! loop flushes after each line, so a crash loses at most the line in flight.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Transcript file name for a session started at `started`
pub fn transcript_file_name(started: DateTime<Local>) -> String {
    format!("can_log_{}.txt", started.format("%Y%m%d_%H%M%S"))
}

/// Open (or append to) the transcript file in `dir`
pub fn open_transcript(dir: &Path, started: DateTime<Local>) -> Result<(PathBuf, BufWriter<File>)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let path = dir.join(transcript_file_name(started));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open transcript file: {:?}", path))?;

    log::debug!("Transcript file: {:?}", path);
    Ok((path, BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_transcript_file_name() {
        assert_eq!(transcript_file_name(started()), "can_log_20240309_140507.txt");
    }

    #[test]
    fn test_transcript_appends() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("logs");

        let (path, mut writer) = open_transcript(&out, started()).unwrap();
        writeln!(writer, "ID:17C:00 01").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let (again, mut writer) = open_transcript(&out, started()).unwrap();
        assert_eq!(path, again);
        writeln!(writer, "ID:136:FF").unwrap();
        writer.flush().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ID:17C:00 01\nID:136:FF\n");
    }
}
