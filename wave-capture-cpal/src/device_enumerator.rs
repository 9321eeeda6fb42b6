//! Input device enumeration through the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use wave_capture_core::models::audio_models::AudioSource;
use wave_capture_core::models::error::CaptureError;

/// Lists and resolves input devices on the default host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input devices, marking the host default.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, CaptureError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to enumerate input devices: {}", e)))?;

        let names = devices
            .enumerate()
            .map(|(i, device)| device.name().unwrap_or_else(|_| format!("Input {}", i)))
            .collect();

        Ok(sources_from_names(names, self.default_input_name().as_deref()))
    }

    /// Name of the default input device, if the host has one.
    pub fn default_input_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Resolve a device by exact name, or the default device for `None`.
    pub fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        let Some(wanted) = name else {
            return self
                .host
                .default_input_device()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()));
        };

        self.host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to enumerate input devices: {}", e)))?
            .find(|device| device.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("input device not found: {}", wanted)))
    }
}

/// cpal exposes no stable device id, so the name doubles as the id.
fn sources_from_names(names: Vec<String>, default_name: Option<&str>) -> Vec<AudioSource> {
    names
        .into_iter()
        .map(|name| AudioSource {
            id: name.clone(),
            is_default: default_name == Some(name.as_str()),
            name,
        })
        .collect()
}
