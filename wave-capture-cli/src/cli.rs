//! Command-line interface for wavecap
//!
//! Handles argument parsing and logging configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

/// wavecap - record microphone audio to WAVE files
#[derive(Parser, Debug)]
#[command(name = "wavecap")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace (includes dependencies)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record until Enter is pressed or the duration elapses
    Record(RecordArgs),

    /// List input devices
    Devices,

    /// Print the format of a WAVE file
    Inspect {
        file: PathBuf,
    },

    /// Play a WAVE file with the system player
    Play {
        file: PathBuf,
    },

    /// Delete a recording and its metadata sidecar
    Erase {
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct RecordArgs {
    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds (0 = until Enter)
    #[arg(short, long)]
    pub duration: Option<u32>,

    /// Sample rate in Hz
    #[arg(short = 'r', long)]
    pub sample_rate: Option<u32>,

    /// Channel count (1 or 2)
    #[arg(short, long)]
    pub channels: Option<u16>,

    /// Directory for finished recordings
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Input device name (see `wavecap devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Record a generated test tone instead of the microphone
    #[arg(long)]
    pub synthetic: bool,

    /// Skip the .metadata.json sidecar
    #[arg(long)]
    pub no_metadata: bool,

    /// Play the recording once it is saved
    #[arg(long)]
    pub play: bool,
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Keep dependencies quiet unless tracing
    builder.filter_level(LevelFilter::Warn);

    builder.filter_module("wavecap", args.log_level());
    builder.filter_module("wave_capture_core", args.log_level());
    builder.filter_module("wave_capture_cpal", args.log_level());

    if args.verbose >= 3 {
        builder.filter_module("cpal", args.log_level());
    }

    builder.format_timestamp_millis().init();
}
