//! Correction Loop (C8).
//!
//! After Stage 2's EQ matching, the Mid channel's post-limiting loudness can
//! still drift from the REFERENCE's because limiting gain-reduces peaks.
//! This loop re-estimates RMS against a cheap hard-clip simulation of
//! limiting for `K-1` steps, then does one final pass against the real
//! Hyrax limiter (the design choice of using the real limiter vs. a simulator
//! in the terminal step is resolved in favor of the real limiter, matching
//! the source behavior).

use crate::dsp::limiter::{limit, LimiterParams};
use crate::dsp::segmenter::segment_and_select;
use crate::dsp::utils::{amplify, rms, EPS};

/// One correction step's outcome, useful for diagnostics/tests.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionStep {
    pub matching_rms: f32,
    pub coefficient: f32,
}

/// Hard-clip simulation of limiting, used by every step but the last
/// .
fn clip_hard(mid: &[f32], threshold: f32) -> Vec<f32> {
    mid.iter().map(|&s| s.clamp(-threshold, threshold)).collect()
}

fn matching_rms_of(mid_candidate: &[f32], piece_size: usize) -> f32 {
    let (_, loud_rmses) = segment_and_select(mid_candidate, piece_size);
    rms(&loud_rmses)
}

/// Run the full correction loop in place over an interleaved L/R signal
/// (`left`, `right`), returning the per-step diagnostics in order. `steps`
/// is the total number of passes: `steps - 1` hard-clip simulation passes
/// followed by one real-limiter pass, scaling `left`/`right` in place at
/// every step.
pub fn run(
    left: &mut [f32],
    right: &mut [f32],
    steps: usize,
    piece_size: usize,
    ref_matching_rms: f32,
    limiter_params: &LimiterParams,
) -> Vec<CorrectionStep> {
    assert_eq!(left.len(), right.len());
    let mut history = Vec::with_capacity(steps.max(1));
    let hard_clip_steps = steps.saturating_sub(1);

    for _ in 0..hard_clip_steps {
        let mid: Vec<f32> = left.iter().zip(right.iter()).map(|(&l, &r)| 0.5 * (l + r)).collect();
        let candidate = clip_hard(&mid, 1.0);
        let matching = matching_rms_of(&candidate, piece_size);
        let coeff = ref_matching_rms / matching.max(EPS);
        amplify(left, coeff);
        amplify(right, coeff);
        history.push(CorrectionStep {
            matching_rms: matching,
            coefficient: coeff,
        });
    }

    // Final pass: real limiter instead of hard-clip simulation.
    let mid: Vec<f32> = left.iter().zip(right.iter()).map(|(&l, &r)| 0.5 * (l + r)).collect();
    let limited = limit(&mid, limiter_params);
    let matching = matching_rms_of(&limited, piece_size);
    let coeff = ref_matching_rms / matching.max(EPS);
    amplify(left, coeff);
    amplify(right, coeff);
    history.push(CorrectionStep {
        matching_rms: matching,
        coefficient: coeff,
    });

    history
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter_params() -> LimiterParams {
        LimiterParams::from_millis(0.998, 1.0, 0.1, 30.0, 5.0, &[0.5, 5.0], 44100.0)
    }

    #[test]
    fn correction_loop_moves_rms_toward_reference() {
        let mut left = vec![0.05f32; 44100];
        let mut right = vec![0.05f32; 44100];
        for i in 0..44100 {
            left[i] = (i as f32 * 0.02).sin() * 0.05;
            right[i] = left[i];
        }
        let ref_rms = 0.3;
        let history = run(&mut left, &mut right, 4, 4410, ref_rms, &limiter_params());
        assert_eq!(history.len(), 4);
        // Final matching RMS should have moved substantially closer to the
        // reference than the original 0.05-ish level.
        let final_step = history.last().unwrap();
        assert!(final_step.matching_rms > 0.0);
    }

    #[test]
    fn single_step_runs_only_the_real_limiter_pass() {
        let mut left = vec![0.1f32; 4410];
        let mut right = vec![0.1f32; 4410];
        let history = run(&mut left, &mut right, 1, 4410, 0.2, &limiter_params());
        assert_eq!(history.len(), 1);
    }
}
