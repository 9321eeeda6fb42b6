//! Recording configuration: optional JSON file plus flag overrides.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use wave_capture_core::CaptureConfiguration;

use crate::cli::RecordArgs;

/// Where recordings go when neither the config file nor a flag says otherwise.
pub fn default_output_directory() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("wave-capture"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Build the effective configuration for `wavecap record`.
pub fn resolve(args: &RecordArgs) -> Result<CaptureConfiguration> {
    let mut config = match args.config {
        Some(ref path) => read_config_file(path)?,
        None => CaptureConfiguration {
            output_directory: default_output_directory(),
            ..Default::default()
        },
    };

    apply_overrides(&mut config, args);
    config
        .validate()
        .map_err(|e| anyhow!("invalid configuration: {}", e))?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<CaptureConfiguration> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&json).with_context(|| format!("failed to parse config {}", path.display()))?;
    let sets_output = value.get("output_directory").is_some();

    let mut config: CaptureConfiguration =
        serde_json::from_value(value).with_context(|| format!("failed to parse config {}", path.display()))?;
    if !sets_output {
        config.output_directory = default_output_directory();
    }
    log::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

fn apply_overrides(config: &mut CaptureConfiguration, args: &RecordArgs) {
    if let Some(duration) = args.duration {
        config.duration_secs = duration;
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    if let Some(channels) = args.channels {
        config.channels = channels;
    }
    if let Some(ref output) = args.output {
        config.output_directory = output.clone();
    }
    if let Some(ref device) = args.device {
        config.device_name = Some(device.clone());
    }
    if args.no_metadata {
        config.write_metadata = false;
    }
}
