//! wavecap - capture microphone audio into WAVE files
//!
//! Thin front end over `wave-capture-core`: records with a cpal input (or a
//! synthetic tone), then inspects, plays, or erases the results.

mod cli;
mod config;
mod player;

use std::fs::File;
use std::io;
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use wave_capture_core::processing::wav_format::WAV_HEADER_SIZE;
use wave_capture_core::storage::erase::erase_recording;
use wave_capture_core::storage::metadata;
use wave_capture_core::{CaptureConfiguration, Player, Recorder, SampleSource, SyntheticSource, WaveHeader};
use wave_capture_cpal::{CpalSampleSource, DeviceEnumerator};

use cli::{Command, RecordArgs};
use player::CommandPlayer;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    cli::init_logging(&args);

    match args.command {
        Command::Record(record_args) => run_record(record_args),
        Command::Devices => list_devices(),
        Command::Inspect { file } => inspect(&file),
        Command::Play { file } => Ok(CommandPlayer::system().play(&file)?),
        Command::Erase { file } => {
            erase_recording(&file).with_context(|| format!("cannot erase {}", file.display()))?;
            println!("Erased {}", file.display());
            Ok(())
        }
    }
}

fn run_record(args: RecordArgs) -> Result<()> {
    let config = config::resolve(&args)?;

    if args.synthetic {
        return record(SyntheticSource::new(), config, args.play);
    }

    let source = match config.device_name {
        Some(ref name) => CpalSampleSource::with_device(name.clone()),
        None => CpalSampleSource::default_device(),
    }
    .with_read_timeout(config.read_timeout());
    record(source, config, args.play)
}

fn record<S: SampleSource>(source: S, config: CaptureConfiguration, play: bool) -> Result<()> {
    let duration_secs = config.duration_secs;
    let mut recorder = Recorder::new(source, config)?;

    info!("Starting capture into {}", recorder.config().output_directory.display());
    recorder.start()?;

    if duration_secs > 0 {
        println!("Recording for {}s, press Enter to stop early...", duration_secs);
    } else {
        println!("Recording, press Enter to stop...");
    }

    if let Some(token) = recorder.stop_token() {
        // Left blocked on stdin if the duration ends first; exits with the process.
        thread::Builder::new()
            .name("stdin-stop".into())
            .spawn(move || {
                let mut line = String::new();
                let _ = io::stdin().read_line(&mut line);
                token.cancel();
            })
            .context("failed to spawn stdin watcher")?;
    }

    let artifact = recorder.wait()?;
    println!(
        "Saved {} ({:.2}s, {} bytes, sha256 {})",
        artifact.file_path.display(),
        artifact.duration_secs,
        artifact.file_size(),
        artifact.checksum
    );
    if artifact.diagnostics.drain_truncated {
        eprintln!("warning: stop drain hit its time limit; the last moments may be cut");
    }

    if play {
        recorder.play(&CommandPlayer::system())?;
    }
    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = DeviceEnumerator::new().list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let header = WaveHeader::read_from(&mut file)?;
    let format = header.format()?;
    let file_len = file.metadata()?.len();

    println!("{}", path.display());
    println!("  format:      PCM {}-bit", header.bits_per_sample);
    println!("  sample rate: {} Hz", format.sample_rate());
    println!("  channels:    {}", format.channels());
    println!("  data:        {} bytes", header.data_size);
    println!("  duration:    {:.3}s", format.duration_secs(u64::from(header.data_size)));

    let expected_len = WAV_HEADER_SIZE as u64 + u64::from(header.data_size);
    if file_len != expected_len {
        println!("  warning:     file is {} bytes, header implies {}", file_len, expected_len);
    }

    match metadata::read_metadata(path) {
        Ok(meta) => {
            println!("  id:          {}", meta.id);
            println!("  created:     {}", meta.created_at);
            println!("  sha256:      {}", meta.checksum);
        }
        Err(e) => log::debug!("No metadata sidecar: {}", e),
    }
    Ok(())
}
