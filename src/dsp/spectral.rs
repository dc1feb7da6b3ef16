//! Spectral Analyzer (C4).
//!
//! Thin wrapper around [`crate::dsp::fft::batch_fft_magnitude`] that names
//! the four spectra Stage 2 actually needs: TARGET/REFERENCE crossed with
//! Mid/Side. Kept as its own module (rather than inlined in the
//! orchestrator) because the FIR Synthesizer consumes these spectra
//! directly and independently of how they were produced.

use crate::dsp::fft::batch_fft_magnitude;

/// Average magnitude spectrum for one channel of one side, computed over
/// its admitted ("loud") pieces only.
pub fn average_spectrum(channel: &[f32], loud_pieces: &[(usize, usize)], n_fft: usize) -> Vec<f32> {
    batch_fft_magnitude(channel, loud_pieces, n_fft)
}

/// The four spectra Stage 2 produces: TARGET/REFERENCE crossed with Mid/Side.
#[derive(Debug, Clone)]
pub struct SpectralPair {
    pub mid: Vec<f32>,
    pub side: Vec<f32>,
}

/// Convenience: compute both channels' average spectra for one side in a
/// single call.
pub fn analyze_side(
    mid: &[f32],
    side: &[f32],
    loud_pieces: &[(usize, usize)],
    n_fft: usize,
) -> SpectralPair {
    SpectralPair {
        mid: average_spectrum(mid, loud_pieces, n_fft),
        side: average_spectrum(side, loud_pieces, n_fft),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_side_produces_full_length_spectra() {
        let n_fft = 512usize;
        let mid: Vec<f32> = (0..n_fft * 3).map(|i| (i as f32 * 0.02).sin()).collect();
        let side: Vec<f32> = (0..n_fft * 3).map(|i| (i as f32 * 0.05).cos()).collect();
        let pieces = vec![(0usize, mid.len())];
        let pair = analyze_side(&mid, &side, &pieces, n_fft);
        assert_eq!(pair.mid.len(), n_fft);
        assert_eq!(pair.side.len(), n_fft);
    }

    #[test]
    fn silent_side_has_zero_spectrum() {
        let n_fft = 256usize;
        let mid = vec![0.0f32; n_fft * 2];
        let pieces = vec![(0usize, mid.len())];
        let spectrum = average_spectrum(&mid, &pieces, n_fft);
        assert!(spectrum.iter().all(|&v| v == 0.0));
    }
}
