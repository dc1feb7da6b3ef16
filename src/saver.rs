//! Audio sink writing: the `Saver` contract consumed at Stage 4.
//!
//! Mirrors [`crate::loader`]: the core hands over planar float32 PCM, a
//! sample rate and a requested [`BitDepth`], and the `Saver` is responsible
//! for the container format. [`WavSaver`] is the default, built on `hound`.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::types::BitDepth;

/// Sink for finished PCM. Implementations are synchronous.
pub trait Saver {
    fn save(&self, path: &str, pcm: &[Vec<f32>], sample_rate: u32, bit_depth: BitDepth) -> Result<()>;
}

/// Default [`Saver`] backed by `hound`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavSaver;

impl Saver for WavSaver {
    fn save(&self, path: &str, pcm: &[Vec<f32>], sample_rate: u32, bit_depth: BitDepth) -> Result<()> {
        let channels = pcm.len() as u16;
        let (bits_per_sample, sample_format) = match bit_depth {
            BitDepth::Pcm16 => (16, SampleFormat::Int),
            BitDepth::Pcm24 => (24, SampleFormat::Int),
            BitDepth::Float32 => (32, SampleFormat::Float),
        };
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        };

        let mut writer = WavWriter::create(path, spec).with_context(|| format!("failed to create WAV stream '{path}'"))?;
        let frames = pcm.first().map(|c| c.len()).unwrap_or(0);

        for frame in 0..frames {
            for channel in pcm {
                let sample = channel[frame];
                match bit_depth {
                    BitDepth::Pcm16 => {
                        let v = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                        writer.write_sample(v)?;
                    }
                    BitDepth::Pcm24 => {
                        let scale = 2f32.powi(23) - 1.0;
                        let v = (sample.clamp(-1.0, 1.0) * scale) as i32;
                        writer.write_sample(v)?;
                    }
                    BitDepth::Float32 => {
                        writer.write_sample(sample)?;
                    }
                }
            }
        }

        writer.finalize().with_context(|| format!("failed to finalize WAV stream '{path}'"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_back_pcm16() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out16.wav");
        let left: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();
        let right = left.clone();

        let saver = WavSaver;
        saver
            .save(path.to_str().unwrap(), &[left.clone(), right.clone()], 44100, BitDepth::Pcm16)
            .unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.len() as usize, left.len() * 2);
    }

    #[test]
    fn writes_float32() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("outf32.wav");
        let channel = vec![0.25f32; 500];

        let saver = WavSaver;
        saver
            .save(path.to_str().unwrap(), &[channel], 48000, BitDepth::Float32)
            .unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_format, hound::SampleFormat::Float);
    }
}
