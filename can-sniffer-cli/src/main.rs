//! CAN Sniffer CLI Application
//!
//! Interactive front end for the can-sniffer library. It adds:
//! - Serial port and transcript replay line sources
//! - Raw line transcript and snapshot export files
//! - Keyboard commands and the live display
//! - TOML configuration with command line overrides

use anyhow::{bail, Result};
use can_sniffer::{Comparison, LineSource};
use chrono::Local;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

mod config;
mod console;
mod report;
mod serial;
mod session;
mod transcript;

use config::AppConfig;
use session::Session;

/// CAN Sniffer - find the CAN signals that react to a physical stimulus
#[derive(Parser, Debug)]
#[command(name = "can-sniffer")]
#[command(about = "Capture CAN frames from a serial adapter and isolate changing IDs", long_about = None)]
#[command(version)]
struct Args {
    /// Serial port name (e.g. COM11, /dev/ttyUSB0)
    #[arg(short, long, value_name = "PORT")]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, value_name = "BAUD")]
    baud: Option<u32>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the transcript and snapshot files
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Replay a recorded transcript instead of reading a serial port
    #[arg(long, value_name = "FILE", conflicts_with = "port")]
    replay: Option<PathBuf>,

    /// Delay between replayed lines in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1)]
    replay_interval: u64,

    /// Compare adjacent byte pairs instead of whole payloads
    #[arg(long)]
    byte_pair: bool,

    /// Ingestion window in milliseconds
    #[arg(long, value_name = "MS")]
    window_ms: Option<u64>,

    /// Do not write the raw line transcript
    #[arg(long)]
    no_transcript: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Sniffer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using sniffer library v{}", can_sniffer::VERSION);

    let config = resolve_config(&args)?;
    let session = Session::new(&config)?;

    // Open the line source first: a port that cannot be opened ends the run here
    let (source, origin): (Box<dyn LineSource>, String) = match &args.replay {
        Some(path) => (
            Box::new(serial::open_replay(
                path,
                Duration::from_millis(args.replay_interval),
            )?) as Box<dyn LineSource>,
            format!("replay of {}", path.display()),
        ),
        None => {
            let Some(port) = config.serial.port.as_deref() else {
                bail!("No serial port given (use --port or [serial] port in the config file)");
            };
            let source = serial::open_serial(
                port,
                config.serial.baud_rate,
                Duration::from_millis(config.serial.read_timeout_ms),
            )?;
            (
                Box::new(source) as Box<dyn LineSource>,
                format!("{} at {} baud", port, config.serial.baud_rate),
            )
        }
    };

    let started = Local::now();
    let (transcript, transcript_note): (Box<dyn Write + Send>, String) = if config.output.transcript {
        let (path, writer) = transcript::open_transcript(&config.output.dir, started)?;
        (Box::new(writer) as Box<dyn Write + Send>, format!("logging to {}", path.display()))
    } else {
        (Box::new(io::sink()) as Box<dyn Write + Send>, "transcript disabled".to_string())
    };

    println!("═══════════════════════════════════════════════");
    println!("  CAN Sniffer");
    println!("═══════════════════════════════════════════════");
    println!("Connected to {}, {}", origin, transcript_note);
    println!(
        "Comparison: {}, window: {} ms, targets: {}, parameters: {}",
        config.sniffer.comparison,
        config.sniffer.window_ms,
        config.sniffer.targets.len(),
        config.sniffer.parameters.len()
    );
    println!("{}\n", console::KEY_HELP);

    session.run(source, transcript)
}

/// Load the config file (if any) and apply command line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(port) = &args.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(dir) = &args.output_dir {
        config.output.dir = dir.clone();
    }
    if let Some(window_ms) = args.window_ms {
        config.sniffer.window_ms = window_ms;
    }
    if args.byte_pair {
        config.sniffer.comparison = Comparison::BytePair;
    }
    if args.no_transcript {
        config.output.transcript = false;
    }

    config.validate()?;
    Ok(config)
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    // The session runs the terminal in raw mode, hence the explicit "\r\n"
    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            write!(
                buf,
                "[{} {}] {}{}",
                record.level(),
                record.target(),
                record.args(),
                console::EOL
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from(["can-sniffer", "--port", "COM11", "-b", "500000", "-vv"]).unwrap();
        assert_eq!(args.port.as_deref(), Some("COM11"));
        assert_eq!(args.baud, Some(500_000));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.replay_interval, 1);
    }

    #[test]
    fn test_replay_conflicts_with_port() {
        let result = Args::try_parse_from(["can-sniffer", "--port", "COM11", "--replay", "log.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::try_parse_from([
            "can-sniffer",
            "--port",
            "/dev/ttyUSB0",
            "--byte-pair",
            "--window-ms",
            "250",
            "--output-dir",
            "out",
            "--no-transcript",
        ])
        .unwrap();
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.serial.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.sniffer.comparison, Comparison::BytePair);
        assert_eq!(config.sniffer.window_ms, 250);
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert!(!config.output.transcript);
    }

    #[test]
    fn test_zero_window_rejected() {
        let args = Args::try_parse_from(["can-sniffer", "--window-ms", "0"]).unwrap();
        assert!(resolve_config(&args).is_err());
    }
}
