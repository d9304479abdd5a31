//! Audio-derived palettes and a frame-by-frame reactive visual mapping.
//!
//! The offline side decodes a file, extracts mel-band features, clusters them
//! and derives a deterministic color palette from the file's bytes. The live
//! side turns per-tick spectrum frames into scale, rotation, color and height
//! updates for an external renderer.

pub mod audio;
pub mod config;
pub mod error;
pub mod palette;
pub mod reactive;

pub use error::{ConfigError, DeriveError};

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    pub fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    /// Encode interleaved samples as a 16-bit PCM WAV file in memory.
    pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer
                    .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }
}
