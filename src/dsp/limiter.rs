//! Look-ahead brickwall limiter ("Hyrax") (C7).
//!
//! Reads a window of future samples through a delay line, derives an
//! instantaneous reduction request from the peak in that window, and tracks
//! it with an attack/hold/release envelope follower plus a cascade of
//! one-pole smoothing stages before applying gain and a final safety clip.
//! This is the single most parameter-dense module in the pipeline — every
//! time constant is configurable because mastering engineers expect to tune
//! it per source.

use crate::dsp::utils::time_constant_coeff;

/// Configuration for one limiter pass. All time fields are milliseconds
/// except `hold_samples`, which the orchestrator derives from `hold_ms` and
/// the internal sample rate before constructing this.
#[derive(Debug, Clone, Copy)]
pub struct LimiterParams {
    pub threshold: f32,
    pub lookahead_samples: usize,
    pub attack_coeff: f32,
    pub release_coeff: f32,
    pub hold_samples: usize,
    /// One-pole smoothing coefficients applied in cascade after the
    /// attack/hold/release follower. At least two stages recommended.
    pub smoothing_coeffs: Vec<f32>,
}

impl LimiterParams {
    /// Build limiter parameters from millisecond time constants and a
    /// sample rate, the form the orchestrator/config actually hold.
    pub fn from_millis(
        threshold: f32,
        lookahead_ms: f32,
        attack_ms: f32,
        release_ms: f32,
        hold_ms: f32,
        smoothing_stages_ms: &[f32],
        sample_rate: f32,
    ) -> Self {
        Self {
            threshold,
            lookahead_samples: ((lookahead_ms * 0.001 * sample_rate).round() as usize).max(1),
            attack_coeff: time_constant_coeff(attack_ms, sample_rate),
            release_coeff: time_constant_coeff(release_ms, sample_rate),
            hold_samples: (hold_ms * 0.001 * sample_rate).round() as usize,
            smoothing_coeffs: smoothing_stages_ms
                .iter()
                .map(|&ms| time_constant_coeff(ms, sample_rate))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FollowerState {
    Tracking,
    Attacking,
    Holding,
}

/// Gain-follower state carried across the whole signal. Exposed separately
/// from [`limit`] so a caller (e.g. the Correction Loop) can run the
/// follower on successive chunks of the same logical signal without
/// resetting state — not currently exercised, but keeps "prepare" state
/// separate from the per-sample tick.
struct Follower {
    r_ahr: f32,
    state: FollowerState,
    hold_counter: usize,
    smoothing_state: Vec<f32>,
}

impl Follower {
    fn new(stages: usize) -> Self {
        Self {
            r_ahr: 1.0,
            state: FollowerState::Tracking,
            hold_counter: 0,
            smoothing_state: vec![1.0; stages],
        }
    }

    fn tick(&mut self, r_req: f32, params: &LimiterParams) -> f32 {
        match self.state {
            FollowerState::Tracking => {
                if r_req < self.r_ahr {
                    self.state = FollowerState::Attacking;
                    self.r_ahr -= (self.r_ahr - r_req) * (1.0 - params.attack_coeff);
                } else {
                    self.r_ahr += (1.0 - self.r_ahr) * (1.0 - params.release_coeff);
                }
            }
            FollowerState::Attacking => {
                self.r_ahr -= (self.r_ahr - r_req) * (1.0 - params.attack_coeff);
                if self.r_ahr <= r_req {
                    self.state = FollowerState::Holding;
                    self.hold_counter = params.hold_samples;
                }
            }
            FollowerState::Holding => {
                if r_req < self.r_ahr {
                    // A deeper reduction arrived mid-hold: restart the attack.
                    self.state = FollowerState::Attacking;
                    self.r_ahr -= (self.r_ahr - r_req) * (1.0 - params.attack_coeff);
                } else if self.hold_counter == 0 {
                    self.state = FollowerState::Tracking;
                } else {
                    self.hold_counter -= 1;
                }
            }
        }
        self.r_ahr = self.r_ahr.clamp(0.0, 1.0);

        let mut g = self.r_ahr;
        for (stage_state, &coeff) in self.smoothing_state.iter_mut().zip(params.smoothing_coeffs.iter()) {
            if g < *stage_state {
                *stage_state = g; // descent passes through unsmoothed (asymmetric cascade)
            } else {
                *stage_state += (g - *stage_state) * (1.0 - coeff);
            }
            g = *stage_state;
        }
        g
    }
}

/// Run the Hyrax limiter over `x`. Since this engine processes whole
/// buffers offline rather than streaming in real time, the look-ahead
/// window at sample `i` is read directly from `x[i..i+lookahead_samples]`
/// and the gain is applied to `x[i]` itself — there is no need to hold a
/// physical delay line and push a correspondingly delayed output, the way
/// a real-time plugin must. The result is a same-length, same-alignment
/// output whose peak never exceeds `threshold` (plus negligible
/// floating-point slack, removed by the final clip).
pub fn limit(x: &[f32], params: &LimiterParams) -> Vec<f32> {
    let la = params.lookahead_samples;
    let mut follower = Follower::new(params.smoothing_coeffs.len());
    let mut out = vec![0.0f32; x.len()];

    for i in 0..x.len() {
        let window_end = (i + la + 1).min(x.len());
        let window = &x[i..window_end];
        let window_peak = window.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        let r_req = if window_peak > params.threshold {
            (params.threshold / window_peak).min(1.0)
        } else {
            1.0
        };

        let gain = follower.tick(r_req, params);
        let delayed_sample = x[i];
        let applied = delayed_sample * gain;
        out[i] = applied.clamp(-params.threshold, params.threshold);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params(threshold: f32) -> LimiterParams {
        LimiterParams::from_millis(threshold, 1.0, 0.1, 30.0, 5.0, &[0.5, 5.0], 44100.0)
    }

    #[test]
    fn compliant_signal_is_left_unchanged_in_amplitude() {
        let params = test_params(0.998);
        let x: Vec<f32> = (0..4410).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let out = limit(&x, &params);
        for i in 200..x.len() {
            assert!((out[i] - x[i]).abs() < 0.05, "unexpected change at {}", i);
        }
    }

    #[test]
    fn peak_never_exceeds_threshold() {
        let params = test_params(0.9981);
        let mut x = vec![0.1f32; 2000];
        x[1000] = 1.5;
        x[1001] = -1.5;
        let out = limit(&x, &params);
        for &s in &out {
            assert!(s.abs() <= params.threshold + 1e-4, "peak exceeded: {}", s);
        }
    }

    #[test]
    fn gain_recovers_after_transient() {
        let params = test_params(0.998);
        let mut x = vec![0.1f32; 20000];
        x[5000] = 1.8;
        let out = limit(&x, &params);
        // Well after the transient and release time, signal should track
        // input shape closely again (gain back near 1.0).
        let tail_ratio = out[19000] / x[19000];
        assert!((tail_ratio - 1.0).abs() < 0.1, "gain did not recover: {}", tail_ratio);
    }
}
