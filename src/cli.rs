//! Command-line interface for voxloop
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Voice conversation loop: speak, get an answer, hear it back
#[derive(Parser, Debug)]
#[command(name = "voxloop", version, about = "Hands-free voice conversation loop")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress status output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: stage progress, -vv: full diagnostics)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device (see `voxloop devices`)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Silence after the last final transcript before the utterance is
    /// committed. Examples: 1500ms, 2s
    #[arg(long, value_name = "DURATION", value_parser = parse_grace_period)]
    pub grace_period: Option<Duration>,
}

/// Parse a grace-period string into a duration.
///
/// Supports any format accepted by `humantime` (`750ms`, `2s`, `1m`);
/// a bare number is read as milliseconds.
fn parse_grace_period(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input and output devices
    Devices,

    /// Synthesize a line of text and play it (synthesis check)
    Say {
        /// Text to speak
        text: String,
    },
}
