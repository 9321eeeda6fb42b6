//! PCM sample conversion.
//!
//! Output is always little-endian, independent of host byte order.

/// Append `samples` to `out` as little-endian byte pairs.
///
/// Output grows by `samples.len() * 2` bytes.
pub fn write_le_bytes(samples: &[i16], out: &mut Vec<u8>) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        let bits = sample as u16;
        out.push((bits & 0xff) as u8);
        out.push((bits >> 8) as u8);
    }
}

/// Convert samples to a new little-endian byte vector.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    write_le_bytes(samples, &mut data);
    data
}

/// Convert an f32 sample `[-1.0, 1.0]` to signed 16-bit. Clamps out-of-range values.
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}
