//! Audio source loading: the `Loader` contract consumed at Stage 0.
//!
//! The core never inspects a container format itself; it asks a `Loader`
//! for decoded planar float32 PCM and a sample rate, then resamples and
//! promotes mono to stereo itself in Stage 0. [`WavLoader`] is the default,
//! built on `hound`, exactly like the validation tooling this codebase
//! already shipped against WAV fixtures.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};

/// Decoded audio as returned by a [`Loader`]: planar channels at the
/// stream's native sample rate.
pub struct LoadedAudio {
    pub pcm: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

/// Source of decoded PCM. Implementations are synchronous; an async
/// adapter may wrap one at the process boundary but must not interleave
/// with DSP state.
pub trait Loader {
    fn load(&self, path: &str) -> Result<LoadedAudio>;
}

/// Default [`Loader`] backed by `hound`. Supports 16-bit and 24-bit integer
/// PCM and 32-bit float WAV; mono files are promoted to stereo by the
/// orchestrator, not here — this just reports however many channels it read.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavLoader;

impl Loader for WavLoader {
    fn load(&self, path: &str) -> Result<LoadedAudio> {
        let reader = WavReader::open(path).with_context(|| format!("failed to open WAV stream '{path}'"))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            bail!("WAV stream '{path}' declares zero channels");
        }

        let mut pcm: Vec<Vec<f32>> = vec![Vec::new(); channels];

        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, 32) => {
                for (i, sample) in reader.into_samples::<f32>().enumerate() {
                    let sample = sample.with_context(|| format!("decode error in '{path}'"))?;
                    pcm[i % channels].push(sample);
                }
            }
            (SampleFormat::Int, 16) => {
                for (i, sample) in reader.into_samples::<i16>().enumerate() {
                    let sample = sample.with_context(|| format!("decode error in '{path}'"))?;
                    pcm[i % channels].push(sample as f32 / i16::MAX as f32);
                }
            }
            (SampleFormat::Int, 24) | (SampleFormat::Int, 32) => {
                let scale = 2f32.powi(spec.bits_per_sample as i32 - 1) - 1.0;
                for (i, sample) in reader.into_samples::<i32>().enumerate() {
                    let sample = sample.with_context(|| format!("decode error in '{path}'"))?;
                    pcm[i % channels].push(sample as f32 / scale);
                }
            }
            (format, bits) => bail!("unsupported WAV format in '{path}': {:?} {}-bit", format, bits),
        }

        Ok(LoadedAudio {
            pcm,
            sample_rate: spec.sample_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn write_test_wav(path: &std::path::Path, channels: u16, sample_rate: u32) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..1000u32 {
            let v = ((i as f32 * 0.01).sin() * 10000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn loads_stereo_wav_with_correct_channel_count() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("stereo.wav");
        write_test_wav(&path, 2, 44100);

        let loader = WavLoader;
        let audio = loader.load(path.to_str().unwrap()).unwrap();
        assert_eq!(audio.pcm.len(), 2);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.pcm[0].len(), 1000);
    }

    #[test]
    fn loads_mono_wav_as_single_channel() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mono.wav");
        write_test_wav(&path, 1, 48000);

        let loader = WavLoader;
        let audio = loader.load(path.to_str().unwrap()).unwrap();
        assert_eq!(audio.pcm.len(), 1);
    }

    #[test]
    fn missing_file_is_an_error() {
        let loader = WavLoader;
        assert!(loader.load("/nonexistent/path/to/file.wav").is_err());
    }
}
