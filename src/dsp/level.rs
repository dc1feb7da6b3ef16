//! Level Analyzer (C3).
//!
//! Derives the scalar "matching RMS" for TARGET and REFERENCE Mid channels
//! and the single gain coefficient that is applied uniformly to TARGET Mid
//! *and* Side in Stage 1. Operates purely on already-segmented loud-piece
//! RMS vectors — segmentation itself lives in [`crate::dsp::segmenter`].

use crate::dsp::utils::{rms, EPS};

/// The RMS of a set of per-piece RMSes — the single scalar a side presents
/// to the level matcher.
#[inline]
pub fn matching_rms(loud_piece_rmses: &[f32]) -> f32 {
    rms(loud_piece_rmses)
}

/// Outcome of Stage 1's level analysis.
#[derive(Debug, Clone, Copy)]
pub struct LevelMatch {
    pub target_matching_rms: f32,
    pub reference_matching_rms: f32,
    /// `reference_matching_rms / max(target_matching_rms, EPS)`.
    pub rms_coefficient: f32,
    /// True if the TARGET matching RMS had to be clamped to EPS (near
    /// silence) — callers should surface this as a warning event.
    pub target_was_silent: bool,
}

/// Compute the Stage 1 gain coefficient from the two sides' loud-piece Mid
/// RMS vectors.
pub fn analyze(target_loud_mid_rmses: &[f32], reference_loud_mid_rmses: &[f32]) -> LevelMatch {
    let target_matching_rms = matching_rms(target_loud_mid_rmses);
    let reference_matching_rms = matching_rms(reference_loud_mid_rmses);

    let target_was_silent = target_matching_rms < EPS;
    let safe_target = target_matching_rms.max(EPS);

    LevelMatch {
        target_matching_rms,
        reference_matching_rms,
        rms_coefficient: reference_matching_rms / safe_target,
        target_was_silent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_only_match_scales_by_ten() {
        // TARGET pieces around 0.05 RMS, REFERENCE pieces around 0.5 RMS.
        let target = vec![0.05f32; 4];
        let reference = vec![0.5f32; 4];
        let result = analyze(&target, &reference);
        assert!((result.rms_coefficient - 10.0).abs() < 1e-3);
    }

    #[test]
    fn identity_reference_gives_unit_coefficient() {
        let rmses = vec![0.1f32, 0.12, 0.09, 0.11];
        let result = analyze(&rmses, &rmses);
        assert!((result.rms_coefficient - 1.0).abs() < 1e-6);
    }

    #[test]
    fn silent_target_is_clamped_not_infinite() {
        let target = vec![0.0f32; 4];
        let reference = vec![0.3f32; 4];
        let result = analyze(&target, &reference);
        assert!(result.target_was_silent);
        assert!(result.rms_coefficient.is_finite());
    }
}
