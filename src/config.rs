//! Pipeline configuration.
//!
//! Plain, serde-serializable structs with `Default` impls matching the
//! documented defaults, plus validation that rejects configurations the
//! DSP stages can't safely run with.

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};

/// Hyrax limiter parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub threshold: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub hold_ms: f32,
    pub lookahead_ms: f32,
    pub smoothing_stages_ms: Vec<f32>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold: 0.9988, // ~ -0.01 dBFS
            attack_ms: 0.1,
            release_ms: 30.0,
            hold_ms: 5.0,
            lookahead_ms: 1.0,
            smoothing_stages_ms: vec![0.5, 5.0],
        }
    }
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub internal_sample_rate: u32,
    pub fft_size: usize,
    pub piece_size_seconds: f32,
    pub max_length_minutes: f32,
    pub lin_log_oversampling: usize,
    pub loess_span: f32,
    pub rms_correction_steps: usize,
    pub limiter: LimiterConfig,
    /// `(clipping_threshold, limited_threshold)` sample-count heuristics for
    /// [`crate::dsp::utils::detect_limited`].
    pub clipping_samples_threshold: (usize, usize),
    pub temp_folder: String,
    /// Whether the FIR Synthesizer preserves `H[1]`/`H[N-1]` verbatim after
    /// smoothing.
    pub preserve_edge_bins: bool,
    /// Sample count of a preview excerpt's loud window, before crossfades.
    pub preview_size: usize,
    /// Crossfade length applied at each cut when rendering a preview.
    pub preview_crossfade_samples: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            internal_sample_rate: 44100,
            fft_size: 32768,
            piece_size_seconds: 15.0,
            max_length_minutes: 30.0,
            lin_log_oversampling: 4,
            loess_span: 0.075,
            rms_correction_steps: 4,
            limiter: LimiterConfig::default(),
            clipping_samples_threshold: (8, 128),
            temp_folder: std::env::temp_dir().to_string_lossy().into_owned(),
            preserve_edge_bins: true,
            preview_size: 30 * 44100,
            preview_crossfade_samples: 441, // 10ms at 44100 Hz
        }
    }
}

impl Config {
    pub fn piece_size_samples(&self) -> usize {
        (self.piece_size_seconds * self.internal_sample_rate as f32).round() as usize
    }

    /// Validate configuration-kind errors: non-power-of-two FFT
    /// size, non-positive piece size, invalid limiter threshold.
    pub fn validate(&self) -> MatchResult<()> {
        if self.fft_size == 0 || (self.fft_size & (self.fft_size - 1)) != 0 {
            return Err(MatchError::Configuration(format!(
                "fft_size must be a power of two, got {}",
                self.fft_size
            )));
        }
        if self.piece_size_seconds <= 0.0 {
            return Err(MatchError::Configuration(format!(
                "piece_size_seconds must be positive, got {}",
                self.piece_size_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.limiter.threshold) {
            return Err(MatchError::Configuration(format!(
                "limiter.threshold must be in (0, 1], got {}",
                self.limiter.threshold
            )));
        }
        if self.rms_correction_steps == 0 {
            return Err(MatchError::Configuration(
                "rms_correction_steps must be at least 1".to_string(),
            ));
        }
        if self.lin_log_oversampling == 0 {
            return Err(MatchError::Configuration(
                "lin_log_oversampling must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn non_power_of_two_fft_size_is_rejected() {
        let mut config = Config::default();
        config.fft_size = 30000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_piece_size_is_rejected() {
        let mut config = Config::default();
        config.piece_size_seconds = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = Config::default();
        config.limiter.threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn piece_size_samples_matches_rate() {
        let config = Config::default();
        assert_eq!(config.piece_size_samples(), 15 * 44100);
    }
}
