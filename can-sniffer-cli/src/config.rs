//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use can_sniffer::SnifferConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub sniffer: SnifferConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Port name, e.g. "COM11" or "/dev/ttyUSB0"
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory for the transcript and snapshot files
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Write the raw line transcript
    #[serde(default = "default_true")]
    pub transcript: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            transcript: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Live display refresh interval
    #[serde(default = "default_refresh")]
    pub refresh_ms: u64,
    /// Keyboard poll interval of the command loop
    #[serde(default = "default_poll")]
    pub poll_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh(),
            poll_ms: default_poll(),
        }
    }
}

fn default_refresh() -> u64 {
    1000
}

fn default_poll() -> u64 {
    100
}

impl AppConfig {
    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.sniffer
            .validate()
            .context("Invalid sniffer configuration")?;
        self.display.validate()
    }
}

impl DisplayConfig {
    /// Both intervals pace a loop, so neither may be zero
    pub fn validate(&self) -> Result<()> {
        if self.refresh_ms == 0 {
            bail!("display.refresh_ms must be greater than zero");
        }
        if self.poll_ms == 0 {
            bail!("display.poll_ms must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Parse and validate configuration text
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}
