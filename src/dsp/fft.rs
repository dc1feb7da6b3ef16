//! FFT-backed primitives (C1 continued): batched magnitude averaging and
//! full-length linear convolution via frequency-domain multiplication.
//!
//! Built on `rustfft`, planned once per call site and reused across blocks:
//! one `FftPlanner` per analysis call rather than per block.

use rustfft::num_complex::Complex32;
use rustfft::FftPlanner;

/// Windowed per-block magnitude spectrum, averaged over every block in
/// every admitted ("loud") piece of a channel.
///
/// `piece_size` and `n_fft` are in samples; pieces narrower than `n_fft` are
/// skipped (can't happen for admitted pieces given the length validation in
/// Stage 0, but the loop is defensive).
pub fn batch_fft_magnitude(channel: &[f32], pieces: &[(usize, usize)], n_fft: usize) -> Vec<f32> {
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let mut channel_sum = vec![0.0f64; n_fft];
    let mut channel_pieces = 0usize;

    let mut scratch: Vec<Complex32> = vec![Complex32::default(); n_fft];

    for &(start, end) in pieces {
        let piece = &channel[start..end];
        let blocks_per_piece = piece.len() / n_fft;
        if blocks_per_piece == 0 {
            continue;
        }

        let mut piece_sum = vec![0.0f64; n_fft];
        for b in 0..blocks_per_piece {
            let block = &piece[b * n_fft..(b + 1) * n_fft];
            for (dst, &src) in scratch.iter_mut().zip(block.iter()) {
                *dst = Complex32::new(src, 0.0);
            }
            fft.process(&mut scratch);
            for (acc, c) in piece_sum.iter_mut().zip(scratch.iter()) {
                *acc += c.norm() as f64;
            }
        }
        let inv_blocks = 1.0 / blocks_per_piece as f64;
        for (acc, p) in channel_sum.iter_mut().zip(piece_sum.iter()) {
            *acc += p * inv_blocks;
        }
        channel_pieces += 1;
    }

    if channel_pieces == 0 {
        return vec![0.0; n_fft];
    }
    let inv_pieces = 1.0 / channel_pieces as f64;
    channel_sum.into_iter().map(|v| (v * inv_pieces) as f32).collect()
}

fn next_pow2(n: usize) -> usize {
    let mut p = 1usize;
    while p < n {
        p <<= 1;
    }
    p
}

/// Full linear convolution via FFT: `N = len(x) + len(h) - 1`, zero-padded
/// to the next power of two, multiplied in the frequency domain, inverse
/// transformed, truncated back to `N` real samples. Not normalized by the
/// caller — `rustfft`'s inverse transform is unnormalized, so this function
/// divides by the FFT length itself to return a true linear convolution.
pub fn fconv(x: &[f32], h: &[f32]) -> Vec<f32> {
    let n = x.len() + h.len() - 1;
    let padded = next_pow2(n);

    let mut planner = FftPlanner::<f32>::new();
    let fwd = planner.plan_fft_forward(padded);
    let inv = planner.plan_fft_inverse(padded);

    let mut xf: Vec<Complex32> = x
        .iter()
        .map(|&v| Complex32::new(v, 0.0))
        .chain(std::iter::repeat(Complex32::default()))
        .take(padded)
        .collect();
    let mut hf: Vec<Complex32> = h
        .iter()
        .map(|&v| Complex32::new(v, 0.0))
        .chain(std::iter::repeat(Complex32::default()))
        .take(padded)
        .collect();

    fwd.process(&mut xf);
    fwd.process(&mut hf);

    for (a, b) in xf.iter_mut().zip(hf.iter()) {
        *a *= *b;
    }

    inv.process(&mut xf);

    let scale = 1.0 / padded as f32;
    xf.into_iter().take(n).map(|c| c.re * scale).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fconv_matches_direct_convolution_small() {
        let x = [1.0f32, 2.0, 3.0];
        let h = [0.5f32, 0.25];
        let out = fconv(&x, &h);
        // direct convolution: y[n] = sum x[k]h[n-k]
        let expected = [0.5, 1.25, 2.0, 0.75];
        assert_eq!(out.len(), expected.len());
        for (a, b) in out.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
        }
    }

    #[test]
    fn fconv_identity_impulse() {
        let x: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let h = [1.0f32];
        let out = fconv(&x, &h);
        assert_eq!(out.len(), x.len());
        for (a, b) in out.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn batch_fft_magnitude_sine_peaks_at_bin() {
        let n_fft = 1024usize;
        let sr = 44100.0f32;
        let freq = 1000.0f32;
        let piece: Vec<f32> = (0..n_fft * 4)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin())
            .collect();
        let pieces = vec![(0usize, piece.len())];
        let mag = batch_fft_magnitude(&piece, &pieces, n_fft);
        let bin = (freq / sr * n_fft as f32).round() as usize;
        let peak_bin = mag
            .iter()
            .take(n_fft / 2)
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak_bin as i64 - bin as i64).abs() <= 1);
    }
}
