//! # wave-capture-cpal
//!
//! Cross-platform microphone backend for wave-capture, built on cpal.
//!
//! Provides:
//! - `CpalSampleSource`: input capture on a dedicated device thread
//! - `DeviceEnumerator`: input device listing and lookup by name
//!
//! ## Usage
//! ```ignore
//! use wave_capture_cpal::CpalSampleSource;
//! use wave_capture_core::{CaptureConfiguration, Recorder};
//!
//! let source = CpalSampleSource::default_device();
//! let mut recorder = Recorder::new(source, CaptureConfiguration::default())?;
//! recorder.start()?;
//! ```

pub mod cpal_input;
pub mod device_enumerator;

pub use cpal_input::{CpalInputStream, CpalSampleSource};
pub use device_enumerator::DeviceEnumerator;
