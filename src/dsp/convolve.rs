//! Convolver (C6).
//!
//! Applies the Mid/Side FIRs synthesized in Stage 2 to the Stage-1 Mid/Side
//! channels via full-length FFT convolution, then trims the filter's own
//! group delay from both ends so the output lines back up with the input
//! in time so downstream stages can recombine without drift.

use crate::dsp::fft::fconv;

/// Convolve `channel` with `fir` and trim `fir.len() / 2` samples from the
/// head and tail, leaving a result one sample longer than `channel`
/// (`fconv` produces `len(channel) + len(fir) - 1` samples; trimming
/// `2 * (N/2)` removes very close to `N - 1`).
pub fn apply_fir(channel: &[f32], fir: &[f32]) -> Vec<f32> {
    let convolved = fconv(channel, fir);
    let trim = fir.len() / 2;
    let end = convolved.len().saturating_sub(trim);
    convolved[trim.min(end)..end].to_vec()
}

/// Apply the Mid and Side FIRs and recombine to L/R (end of
/// Stage 2).
pub fn convolve_and_recombine(mid: &[f32], side: &[f32], fir_mid: &[f32], fir_side: &[f32]) -> (Vec<f32>, Vec<f32>) {
    let filtered_mid = apply_fir(mid, fir_mid);
    let filtered_side = apply_fir(side, fir_side);

    let len = filtered_mid.len().min(filtered_side.len());
    let mut l = Vec::with_capacity(len);
    let mut r = Vec::with_capacity(len);
    for i in 0..len {
        l.push(filtered_mid[i] + filtered_side[i]);
        r.push(filtered_mid[i] - filtered_side[i]);
    }
    (l, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_fir_preserves_signal_length_near_input() {
        let n_fft = 64usize;
        let mut fir = vec![0.0f32; n_fft];
        fir[n_fft / 2] = 1.0; // centered impulse: identity after trim
        let channel: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.01).sin()).collect();
        let out = apply_fir(&channel, &fir);
        assert!((out.len() as i64 - channel.len() as i64).abs() <= 1);
        for i in 0..out.len().min(channel.len()) {
            assert!((out[i] - channel[i]).abs() < 1e-3, "mismatch at {}", i);
        }
    }

    #[test]
    fn recombine_round_trips_through_identity_firs() {
        let n_fft = 32usize;
        let mut fir = vec![0.0f32; n_fft];
        fir[n_fft / 2] = 1.0;
        let mid: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.02).sin()).collect();
        let side: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.03).cos() * 0.1).collect();
        let (l, r) = convolve_and_recombine(&mid, &side, &fir, &fir);
        assert_eq!(l.len(), r.len());
        assert!(!l.is_empty());
    }
}
