//! WAV file format utilities.
//!
//! Builds and decodes the standard 44-byte RIFF/WAVE header that precedes
//! raw little-endian 16-bit PCM.

use std::io::Read;

use crate::models::audio_models::{AudioFormat, BITS_PER_SAMPLE};
use crate::models::error::EncodeError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Size of the PCM `fmt ` chunk body.
pub const FMT_CHUNK_SIZE: u32 = 16;

/// Header bytes counted by the RIFF size field in addition to the payload.
pub const RIFF_SIZE_OVERHEAD: u32 = 36;

/// Largest payload whose RIFF size still fits in 32 bits.
pub const MAX_DATA_SIZE: u64 = (u32::MAX - RIFF_SIZE_OVERHEAD) as u64;

/// Fields of a 44-byte WAVE header.
///
/// Derived from `(data_size, format)` at encode time; never stored apart from
/// the file it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveHeader {
    pub riff_size: u32,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WaveHeader {
    /// Header for `data_size` bytes of PCM in `format`.
    pub fn for_payload(data_size: u64, format: &AudioFormat) -> Result<Self, EncodeError> {
        if data_size > MAX_DATA_SIZE {
            return Err(EncodeError::PayloadTooLarge(data_size));
        }
        let data_size = data_size as u32;
        Ok(Self {
            riff_size: data_size + RIFF_SIZE_OVERHEAD,
            format_tag: format.encoding().format_tag(),
            channels: format.channels(),
            sample_rate: format.sample_rate(),
            byte_rate: format.byte_rate(),
            block_align: format.bytes_per_frame(),
            bits_per_sample: format.bits_per_sample(),
            data_size,
        })
    }

    /// Serialize the header.
    ///
    /// Layout:
    /// ```text
    /// [0-3]    "RIFF"
    /// [4-7]    riff_size = 36 + data_size
    /// [8-11]   "WAVE"
    /// [12-15]  "fmt "
    /// [16-19]  16 (PCM format chunk size)
    /// [20-21]  1 (PCM format code)
    /// [22-23]  channels
    /// [24-27]  sample_rate
    /// [28-31]  byte_rate = sample_rate * block_align
    /// [32-33]  block_align = channels * bits_per_sample / 8
    /// [34-35]  bits_per_sample
    /// [36-39]  "data"
    /// [40-43]  data_size
    /// ```
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        // RIFF chunk descriptor
        header[0..4].copy_from_slice(b"RIFF");
        put_u32_le(&mut header, 4, self.riff_size);
        header[8..12].copy_from_slice(b"WAVE");

        // fmt sub-chunk
        header[12..16].copy_from_slice(b"fmt ");
        put_u32_le(&mut header, 16, FMT_CHUNK_SIZE);
        put_u16_le(&mut header, 20, self.format_tag);
        put_u16_le(&mut header, 22, self.channels);
        put_u32_le(&mut header, 24, self.sample_rate);
        put_u32_le(&mut header, 28, self.byte_rate);
        put_u16_le(&mut header, 32, self.block_align);
        put_u16_le(&mut header, 34, self.bits_per_sample);

        // data sub-chunk
        header[36..40].copy_from_slice(b"data");
        put_u32_le(&mut header, 40, self.data_size);

        header
    }

    /// Decode and validate a header produced for 16-bit linear PCM.
    pub fn parse(bytes: &[u8]) -> Result<Self, EncodeError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(EncodeError::MalformedHeader(format!(
                "expected {} bytes, found {}",
                WAV_HEADER_SIZE,
                bytes.len()
            )));
        }
        expect_tag(bytes, 0, b"RIFF")?;
        expect_tag(bytes, 8, b"WAVE")?;
        expect_tag(bytes, 12, b"fmt ")?;
        expect_tag(bytes, 36, b"data")?;

        let fmt_size = get_u32_le(bytes, 16);
        if fmt_size != FMT_CHUNK_SIZE {
            return Err(EncodeError::MalformedHeader(format!("fmt chunk size {fmt_size}")));
        }

        let header = Self {
            riff_size: get_u32_le(bytes, 4),
            format_tag: get_u16_le(bytes, 20),
            channels: get_u16_le(bytes, 22),
            sample_rate: get_u32_le(bytes, 24),
            byte_rate: get_u32_le(bytes, 28),
            block_align: get_u16_le(bytes, 32),
            bits_per_sample: get_u16_le(bytes, 34),
            data_size: get_u32_le(bytes, 40),
        };

        if header.format_tag != 1 {
            return Err(EncodeError::MalformedHeader(format!(
                "format tag {} is not PCM",
                header.format_tag
            )));
        }
        if header.bits_per_sample != BITS_PER_SAMPLE {
            return Err(EncodeError::MalformedHeader(format!(
                "unsupported bit depth {}",
                header.bits_per_sample
            )));
        }
        let format = header.format()?;
        if header.block_align != format.bytes_per_frame() || header.byte_rate != format.byte_rate() {
            return Err(EncodeError::MalformedHeader(
                "block align or byte rate inconsistent with format".into(),
            ));
        }
        if u64::from(header.riff_size) != u64::from(header.data_size) + u64::from(RIFF_SIZE_OVERHEAD) {
            return Err(EncodeError::MalformedHeader(format!(
                "riff size {} does not match data size {}",
                header.riff_size, header.data_size
            )));
        }
        Ok(header)
    }

    /// Read and decode the first 44 bytes of `reader`.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self, EncodeError> {
        let mut bytes = [0u8; WAV_HEADER_SIZE];
        reader
            .read_exact(&mut bytes)
            .map_err(|e| EncodeError::MalformedHeader(format!("failed to read header: {e}")))?;
        Self::parse(&bytes)
    }

    /// The capture format this header describes.
    pub fn format(&self) -> Result<AudioFormat, EncodeError> {
        AudioFormat::new(self.sample_rate, self.channels)
            .map_err(|e| EncodeError::MalformedHeader(e.to_string()))
    }
}

/// Generate a 44-byte header for `data_size` bytes of PCM in `format`.
pub fn generate_wav_header(format: &AudioFormat, data_size: u64) -> Result<[u8; WAV_HEADER_SIZE], EncodeError> {
    WaveHeader::for_payload(data_size, format).map(|header| header.to_bytes())
}

fn put_u16_le(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset] = (value & 0xff) as u8;
    buf[offset + 1] = (value >> 8) as u8;
}

fn put_u32_le(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset] = (value & 0xff) as u8;
    buf[offset + 1] = ((value >> 8) & 0xff) as u8;
    buf[offset + 2] = ((value >> 16) & 0xff) as u8;
    buf[offset + 3] = (value >> 24) as u8;
}

fn get_u16_le(buf: &[u8], offset: usize) -> u16 {
    u16::from(buf[offset]) | (u16::from(buf[offset + 1]) << 8)
}

fn get_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from(buf[offset])
        | (u32::from(buf[offset + 1]) << 8)
        | (u32::from(buf[offset + 2]) << 16)
        | (u32::from(buf[offset + 3]) << 24)
}

fn expect_tag(buf: &[u8], offset: usize, tag: &[u8; 4]) -> Result<(), EncodeError> {
    if &buf[offset..offset + 4] != tag {
        return Err(EncodeError::MalformedHeader(format!(
            "expected {:?} at offset {}",
            String::from_utf8_lossy(tag),
            offset
        )));
    }
    Ok(())
}
