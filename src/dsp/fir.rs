//! FIR Synthesizer (C5) — the central innovation.
//!
//! Turns a REFERENCE/TARGET magnitude ratio into a smoothed, linear-phase
//! FIR filter: resample onto a log-frequency grid, smooth with a
//! LOESS-style locally-weighted regression, resample back to the linear
//! grid, mirror into a full spectrum, and IFFT+window into an impulse
//! response. Every step here is hand-rolled — cubic splines and LOESS are
//! the defining behavior of this engine, not an ambient concern, so they
//! are not delegated to a numeric crate.

use rustfft::num_complex::Complex32;
use rustfft::FftPlanner;

use crate::dsp::utils::EPS;

/// Knobs that affect the synthesized FIR's shape. Mirrors the subset of
/// [`crate::config::Config`] the synthesizer actually reads, so this module
/// stays testable without constructing a full `Config`.
#[derive(Debug, Clone, Copy)]
pub struct FirParams {
    pub n_fft: usize,
    pub sample_rate: f32,
    pub oversampling: usize,
    pub loess_span: f32,
    /// When true, `H[1]` and `H[N-1]` are preserved verbatim from the raw
    /// ratio rather than taking the smoothed value (an exposed option,
    /// resolved true by default).
    pub preserve_edge_bins: bool,
}

impl Default for FirParams {
    fn default() -> Self {
        Self {
            n_fft: 32768,
            sample_rate: 44100.0,
            oversampling: 4,
            loess_span: 0.075,
            preserve_edge_bins: true,
        }
    }
}

/// Elementwise ratio of reference to target magnitude spectra, target
/// floored at [`EPS`] to avoid divide-by-silence.
pub fn ratio_spectrum(target_spectrum: &[f32], reference_spectrum: &[f32]) -> Vec<f32> {
    debug_assert_eq!(target_spectrum.len(), reference_spectrum.len());
    target_spectrum
        .iter()
        .zip(reference_spectrum.iter())
        .map(|(&t, &r)| r / t.max(EPS))
        .collect()
}

/// Natural cubic spline evaluated at arbitrary query points. `xs` must be
/// strictly increasing. Built once per call (coefficients derived via the
/// standard tridiagonal second-derivative solve), then sampled for every
/// point in `queries`.
pub fn cubic_spline_interp(xs: &[f32], ys: &[f32], queries: &[f32]) -> Vec<f32> {
    let n = xs.len();
    assert_eq!(n, ys.len());
    if n == 0 {
        return vec![0.0; queries.len()];
    }
    if n == 1 {
        return vec![ys[0]; queries.len()];
    }

    // Second derivatives `m[i]` via the natural-boundary tridiagonal system.
    let mut h = vec![0.0f64; n - 1];
    for i in 0..n - 1 {
        h[i] = (xs[i + 1] - xs[i]) as f64;
    }

    let mut alpha = vec![0.0f64; n];
    for i in 1..n - 1 {
        alpha[i] = 3.0 / h[i] * (ys[i + 1] as f64 - ys[i] as f64)
            - 3.0 / h[i - 1] * (ys[i] as f64 - ys[i - 1] as f64);
    }

    let mut l = vec![1.0f64; n];
    let mut mu = vec![0.0f64; n];
    let mut z = vec![0.0f64; n];
    for i in 1..n - 1 {
        l[i] = 2.0 * (xs[i + 1] as f64 - xs[i - 1] as f64) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }

    let mut c = vec![0.0f64; n];
    let mut b = vec![0.0f64; n];
    let mut d = vec![0.0f64; n];
    for j in (0..n - 1).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
        b[j] = (ys[j + 1] as f64 - ys[j] as f64) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
        d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
    }

    queries
        .iter()
        .map(|&q| {
            let qf = q as f64;
            // Locate the containing segment; clamp queries outside [xs[0], xs[n-1]]
            // to the boundary segment (extrapolate via that segment's cubic).
            let i = if qf <= xs[0] as f64 {
                0
            } else if qf >= xs[n - 1] as f64 {
                n - 2
            } else {
                match xs.binary_search_by(|probe| (*probe as f64).partial_cmp(&qf).unwrap()) {
                    Ok(idx) => idx.min(n - 2),
                    Err(idx) => idx.saturating_sub(1).min(n - 2),
                }
            };
            let dx = qf - xs[i] as f64;
            (ys[i] as f64 + b[i] * dx + c[i] * dx * dx + d[i] * dx * dx * dx) as f32
        })
        .collect()
}

/// Tricube weight function used by LOESS, `(1 - |u|^3)^3` for `|u| < 1`.
#[inline]
fn tricube(u: f32) -> f32 {
    let au = u.abs();
    if au >= 1.0 {
        0.0
    } else {
        let t = 1.0 - au * au * au;
        t * t * t
    }
}

/// LOESS-style locally-weighted linear regression over `(xs, ys)`, evaluated
/// at every point in `xs` itself . `span` is the fraction
/// of total points included in each local neighborhood (default 0.075).
///
/// Each point gets its own weighted least-squares line fit over the nearest
/// `window` neighbors (by index, since `xs` here is uniformly log-spaced),
/// weighted by tricube distance. Degree-1 local polynomial — sufficient to
/// preserve broadband tilt while suppressing narrow peaks/notches, per the
/// "any LWR equivalent" allowance.
pub fn loess_smooth(xs: &[f32], ys: &[f32], span: f32) -> Vec<f32> {
    let n = xs.len();
    if n < 3 {
        return ys.to_vec();
    }
    let window = ((span * n as f32).ceil() as usize).clamp(2, n);
    let half = window / 2;

    let mut out = vec![0.0f32; n];
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let lo = if hi - lo < window { hi.saturating_sub(window) } else { lo };

        let x0 = xs[i];
        let max_dist = (xs[lo] - x0).abs().max((xs[hi - 1] - x0).abs()).max(EPS);

        let mut sw = 0.0f64;
        let mut swx = 0.0f64;
        let mut swy = 0.0f64;
        let mut swxx = 0.0f64;
        let mut swxy = 0.0f64;
        for j in lo..hi {
            let u = (xs[j] - x0) / max_dist;
            let w = tricube(u) as f64;
            let x = (xs[j] - x0) as f64;
            let y = ys[j] as f64;
            sw += w;
            swx += w * x;
            swy += w * y;
            swxx += w * x * x;
            swxy += w * x * y;
        }

        // Weighted least squares for y = a + b*x, evaluated at x = 0 (i.e. a).
        let denom = sw * swxx - swx * swx;
        let a = if denom.abs() < 1e-12 {
            if sw > 0.0 {
                swy / sw
            } else {
                ys[i] as f64
            }
        } else {
            (swxx * swy - swx * swxy) / denom
        };
        out[i] = a as f32;
    }
    out
}

/// Build the linear and log frequency grids for an `n_fft`-point spectrum
/// .
pub fn frequency_grids(n_fft: usize, sample_rate: f32, oversampling: usize) -> (Vec<f32>, Vec<f32>) {
    let half = n_fft / 2;
    let nyquist = sample_rate / 2.0;

    let f_lin: Vec<f32> = (0..=half).map(|k| nyquist * k as f32 / half as f32).collect();

    let log_count = half * oversampling + 1;
    let f_min = (4.0 / n_fft as f32) * nyquist;
    let f_max = nyquist;
    let log_min = f_min.max(EPS).ln();
    let log_max = f_max.max(f_min + EPS).ln();
    let f_log: Vec<f32> = (0..log_count)
        .map(|k| {
            let t = k as f32 / (log_count - 1).max(1) as f32;
            (log_min + t * (log_max - log_min)).exp()
        })
        .collect();

    (f_lin, f_log)
}

/// Mirror a half-spectrum `H_half[0..=N/2]` into a full `N`-length spectrum,
/// applying the DC-strip / edge-preserve overrides.
pub fn mirror_spectrum(half: &[f32], raw_ratio: &[f32], n_fft: usize, preserve_edge_bins: bool) -> Vec<f32> {
    let mut full = vec![0.0f32; n_fft];
    let half_len = n_fft / 2;
    for k in 0..=half_len {
        full[k] = half[k];
    }
    for k in 2..half_len {
        full[n_fft - k] = half[k];
    }

    full[0] = 0.0;
    if preserve_edge_bins {
        if raw_ratio.len() > 1 {
            full[1] = raw_ratio[1];
        }
        if let Some(&last) = raw_ratio.last() {
            full[n_fft - 1] = last;
        }
    }
    full
}

/// `Re(IFFT(H))`, shifted by `N/2` to center and windowed with a Hann window
/// of length `N` . Produces the channel's FIR; length is
/// always exactly `len(spectrum)`.
pub fn spectrum_to_fir(spectrum: &[f32]) -> Vec<f32> {
    let n = spectrum.len();
    let mut planner = FftPlanner::<f32>::new();
    let ifft = planner.plan_fft_inverse(n);

    let mut buf: Vec<Complex32> = spectrum.iter().map(|&v| Complex32::new(v, 0.0)).collect();
    ifft.process(&mut buf);
    let scale = 1.0 / n as f32;

    // ifftshift by N/2 to produce a centered, linear-phase impulse response.
    let half = n / 2;
    let mut shifted = vec![0.0f32; n];
    for i in 0..n {
        let src = (i + half) % n;
        shifted[i] = buf[src].re * scale;
    }

    let hann: Vec<f32> = (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32).cos())
        .collect();

    shifted.iter().zip(hann.iter()).map(|(&s, &w)| s * w).collect()
}

/// Full Stage 2 FIR synthesis for one channel.
pub fn synthesize(target_spectrum: &[f32], reference_spectrum: &[f32], params: FirParams) -> Vec<f32> {
    let ratio = ratio_spectrum(target_spectrum, reference_spectrum);
    let (f_lin, f_log) = frequency_grids(params.n_fft, params.sample_rate, params.oversampling);

    let half = params.n_fft / 2;
    let ratio_half = &ratio[0..=half];

    let log_values = cubic_spline_interp(&f_lin, ratio_half, &f_log);
    let smoothed_log = loess_smooth(&f_log, &log_values, params.loess_span);
    let smoothed_lin = cubic_spline_interp(&f_log, &smoothed_log, &f_lin);

    let full = mirror_spectrum(&smoothed_lin, &ratio, params.n_fft, params.preserve_edge_bins);
    spectrum_to_fir(&full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_spline_interpolates_linear_data_exactly() {
        let xs: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|&x| 2.0 * x + 1.0).collect();
        let queries = vec![0.5, 3.25, 8.9];
        let out = cubic_spline_interp(&xs, &ys, &queries);
        for (q, v) in queries.iter().zip(out.iter()) {
            assert!((v - (2.0 * q + 1.0)).abs() < 1e-3, "{} vs {}", v, 2.0 * q + 1.0);
        }
    }

    #[test]
    fn loess_smooth_flattens_narrow_spike() {
        let n = 200;
        let xs: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let mut ys = vec![1.0f32; n];
        ys[100] = 50.0; // narrow spike
        let smoothed = loess_smooth(&xs, &ys, 0.1);
        assert!(smoothed[100] < 10.0, "spike not suppressed: {}", smoothed[100]);
        // Broadband level away from the spike stays close to 1.0.
        assert!((smoothed[10] - 1.0).abs() < 0.2);
    }

    #[test]
    fn loess_smooth_preserves_broadband_tilt() {
        let n = 300;
        let xs: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let ys: Vec<f32> = xs.iter().map(|&x| 0.01 * x).collect(); // linear tilt
        let smoothed = loess_smooth(&xs, &ys, 0.075);
        for i in 20..n - 20 {
            assert!((smoothed[i] - ys[i]).abs() < 0.5, "tilt distorted at {}", i);
        }
    }

    #[test]
    fn synthesize_produces_exact_length_real_fir() {
        let n_fft = 1024usize;
        let target = vec![1.0f32; n_fft];
        let reference = vec![2.0f32; n_fft];
        let params = FirParams {
            n_fft,
            sample_rate: 44100.0,
            oversampling: 4,
            loess_span: 0.075,
            preserve_edge_bins: true,
        };
        let fir = synthesize(&target, &reference, params);
        assert_eq!(fir.len(), n_fft);
        assert!(fir.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn mirror_spectrum_is_symmetric() {
        let n_fft = 16usize;
        let half: Vec<f32> = (0..=n_fft / 2).map(|k| k as f32).collect();
        let raw = vec![1.0f32; n_fft];
        let full = mirror_spectrum(&half, &raw, n_fft, false);
        for k in 2..n_fft / 2 {
            assert_eq!(full[k], full[n_fft - k]);
        }
        assert_eq!(full[0], 0.0);
    }
}
