//! Shared data types passed between the Orchestrator and its components.

use serde::{Deserialize, Serialize};

/// Decoded stereo audio at the internal sample rate: `[left, right]`.
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl StereoBuffer {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// A contiguous analysis window `[start, end)` into a channel.
pub type Piece = (usize, usize);

/// The REFERENCE's analysis bundle , persisted by
/// [`crate::cache::ReferenceCache`] and reused across runs with the same
/// fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceBundle {
    pub ref_matching_rms_m: f32,
    pub ref_matching_rms_s: f32,
    pub ref_avg_spectrum_m: Vec<f32>,
    pub ref_avg_spectrum_s: Vec<f32>,
    pub ref_peak: f32,
    pub ref_sample_count: usize,
    pub internal_rate: u32,
    pub fft_size: usize,
    pub piece_size: usize,
}

/// Output sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitDepth {
    Pcm16,
    Pcm24,
    Float32,
}

/// One requested output of a `process` call.
#[derive(Debug, Clone)]
pub struct ResultSpec {
    pub path: String,
    pub bit_depth: BitDepth,
    pub use_limiter: bool,
    pub normalize: bool,
    /// If true, render only a short excerpt (the loudest contiguous window,
    /// with short crossfades at the cut points) instead of the full signal.
    pub preview: bool,
}

impl ResultSpec {
    pub fn full(path: impl Into<String>, bit_depth: BitDepth) -> Self {
        Self {
            path: path.into(),
            bit_depth,
            use_limiter: true,
            normalize: false,
            preview: false,
        }
    }
}

/// Summary of one completed `process` invocation, returned to the caller
/// once every requested [`ResultSpec`] has been written.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub outputs_written: Vec<String>,
    pub final_amp_coef: f32,
    pub rms_coefficient: f32,
    pub correction_steps: usize,
    pub used_cached_reference: bool,
}
