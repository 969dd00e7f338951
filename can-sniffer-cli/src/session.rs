//! Interactive sniffing session
//!
//! Runs three threads around one shared engine: ingestion (reads the line
//! source), display (redraws the live rows on a fixed interval) and the
//! command loop on the calling thread. Quitting raises the shutdown flag,
//! which both worker threads check on every iteration.

use crate::config::{AppConfig, DisplayConfig};
use crate::console::{self, Command, RawModeGuard};
use crate::report;
use anyhow::{anyhow, Result};
use can_sniffer::{
    run_ingestion, transport, IngestionEnd, LineSource, SnapshotExport, SnifferEngine,
};
use chrono::Local;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Session wiring shared by the command loop and the worker threads
pub struct Session {
    engine: Arc<SnifferEngine>,
    shutdown: Arc<AtomicBool>,
    output_dir: PathBuf,
    display: DisplayConfig,
}

impl Session {
    /// Create a session from a resolved configuration
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            engine: Arc::new(SnifferEngine::new(config.sniffer.clone())?),
            shutdown: Arc::new(AtomicBool::new(false)),
            output_dir: config.output.dir.clone(),
            display: config.display.clone(),
        })
    }

    /// Run until the operator quits
    pub fn run(&self, source: Box<dyn LineSource>, transcript: Box<dyn Write + Send>) -> Result<()> {
        let ingestion = self.spawn_ingestion(source, transcript)?;
        let display = match self.spawn_display() {
            Ok(handle) => handle,
            Err(e) => {
                // Ingestion already holds the port
                self.stop(ingestion, None)?;
                return Err(e.into());
            }
        };

        let result = self.command_loop();

        // Stop the workers whatever ended the command loop
        let end = self.stop(ingestion, Some(display))?;
        log::debug!("Ingestion ended: {:?}", end);

        let stats = self.engine.stats();
        log::info!(
            "Session finished: {} lines received, {} frames ingested, {} parse failures",
            stats.lines_received,
            stats.frames_ingested,
            stats.parse_failures
        );
        result
    }

    fn spawn_ingestion(
        &self,
        mut source: Box<dyn LineSource>,
        mut transcript: Box<dyn Write + Send>,
    ) -> io::Result<JoinHandle<IngestionEnd>> {
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        thread::Builder::new()
            .name("ingestion".to_string())
            .spawn(move || {
                run_ingestion(
                    source.as_mut(),
                    &engine,
                    transcript.as_mut(),
                    &shutdown,
                    transport::DEFAULT_IDLE_PAUSE,
                )
            })
    }

    fn spawn_display(&self) -> io::Result<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        let refresh = Duration::from_millis(self.display.refresh_ms);
        let slice = Duration::from_millis(self.display.poll_ms.max(1));
        thread::Builder::new()
            .name("display".to_string())
            .spawn(move || display_loop(&engine, &shutdown, refresh, slice))
    }

    /// Raise the shutdown flag and join the workers
    fn stop(
        &self,
        ingestion: JoinHandle<IngestionEnd>,
        display: Option<JoinHandle<()>>,
    ) -> Result<IngestionEnd> {
        self.shutdown.store(true, Ordering::SeqCst);
        let end = ingestion
            .join()
            .map_err(|_| anyhow!("Ingestion thread panicked"))?;
        if let Some(display) = display {
            if display.join().is_err() {
                log::warn!("Display thread panicked");
            }
        }
        Ok(end)
    }

    fn command_loop(&self) -> Result<()> {
        let _raw_mode = RawModeGuard::enable()?;
        let poll = Duration::from_millis(self.display.poll_ms);

        while !self.shutdown.load(Ordering::SeqCst) {
            if let Some(command) = console::poll_command(poll)? {
                if !self.handle_command(command) {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Execute one operator command; returns false on quit
    pub fn handle_command(&self, command: Command) -> bool {
        match command {
            Command::Capture => {
                let export = self.engine.capture();
                console::status(&format!("Captured {} frames as baseline", export.frames));
                self.save(&export);
            }
            Command::Classify(direction) => {
                let export = self.engine.classify(direction);
                console::status(&format!(
                    "Snapshot refined: {} frames ({})",
                    export.frames, direction
                ));
                self.save(&export);
            }
            Command::Quit => {
                self.shutdown.store(true, Ordering::SeqCst);
                return false;
            }
        }
        true
    }

    fn save(&self, export: &SnapshotExport) -> Option<PathBuf> {
        match report::write_snapshot(&self.output_dir, export, Local::now()) {
            Ok(path) => {
                console::status(&format!("Saved to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to save snapshot: {:#}", e);
                None
            }
        }
    }
}

fn display_loop(engine: &SnifferEngine, shutdown: &AtomicBool, refresh: Duration, slice: Duration) {
    while !shutdown.load(Ordering::SeqCst) {
        let (targets, parameters) = engine.live_rows();
        let lines = console::format_rows(&targets, &parameters);
        if let Err(e) = console::render_live(&mut io::stdout().lock(), &lines) {
            log::debug!("Display refresh failed: {}", e);
        }

        // Sleep in slices so quitting is not held up by a long refresh interval
        let mut waited = Duration::ZERO;
        while waited < refresh && !shutdown.load(Ordering::SeqCst) {
            thread::sleep(slice);
            waited += slice;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_sniffer::{Direction, Frame, ReadOutcome};
    use chrono::Utc;
    use std::fs;

    fn session(dir: &std::path::Path) -> Session {
        let mut config = AppConfig::default();
        config.output.dir = dir.to_path_buf();
        Session::new(&config).unwrap()
    }

    fn snapshot_files(dir: &std::path::Path) -> Vec<String> {
        let mut files: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_capture_and_classify_write_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let engine = &session.engine;

        engine.ingest(Frame::new(0x17C, vec![0x00, 0x01], Utc::now()));
        assert!(session.handle_command(Command::Capture));

        engine.ingest(Frame::new(0x17C, vec![0x00, 0x02], Utc::now()));
        assert!(session.handle_command(Command::Classify(Direction::Increase)));

        let files = snapshot_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.contains(&"ID:17C:00 01\n".to_string()));
        assert!(files.contains(&"ID:17C:00 02\n".to_string()));
    }

    #[test]
    fn test_quit_raises_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        assert!(!session.handle_command(Command::Quit));
        assert!(session.shutdown.load(Ordering::SeqCst));
        assert!(snapshot_files(dir.path()).is_empty());
    }

    /// Source that never produces a line; records when it is closed
    struct SilentSource {
        closed: Arc<AtomicBool>,
    }

    impl LineSource for SilentSource {
        fn read_line(&mut self) -> can_sniffer::Result<ReadOutcome> {
            thread::sleep(Duration::from_millis(1));
            Ok(ReadOutcome::Idle)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stop_releases_running_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let closed = Arc::new(AtomicBool::new(false));
        let source = SilentSource {
            closed: Arc::clone(&closed),
        };

        let ingestion = session
            .spawn_ingestion(Box::new(source), Box::new(io::sink()))
            .unwrap();
        let end = session.stop(ingestion, None).unwrap();

        assert_eq!(end, IngestionEnd::Cancelled);
        assert!(closed.load(Ordering::SeqCst));
        assert!(session.shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_joins_display() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        let ingestion = session
            .spawn_ingestion(
                Box::new(SilentSource {
                    closed: Arc::new(AtomicBool::new(false)),
                }),
                Box::new(io::sink()),
            )
            .unwrap();
        let display = session.spawn_display().unwrap();

        assert_eq!(
            session.stop(ingestion, Some(display)).unwrap(),
            IngestionEnd::Cancelled
        );
    }

    #[test]
    fn test_display_loop_exits_on_shutdown() {
        let engine = SnifferEngine::new(Default::default()).unwrap();
        let shutdown = AtomicBool::new(true);
        display_loop(&engine, &shutdown, Duration::from_secs(60), Duration::from_millis(1));
    }
}
