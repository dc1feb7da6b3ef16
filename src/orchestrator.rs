//! Pipeline Orchestrator (C10).
//!
//! The single `process()` entry point: sequences Stages 0 through 4,
//! emitting frozen event codes in strict stage order, and produces one
//! rendered output per requested [`ResultSpec`].

use crate::cache::{fingerprint, ReferenceCache};
use crate::config::Config;
use crate::dsp::correction;
use crate::dsp::fir::{self, FirParams};
use crate::dsp::level;
use crate::dsp::limiter::{limit, LimiterParams};
use crate::dsp::segmenter::segment_and_select;
use crate::dsp::spectral::analyze_side;
use crate::dsp::utils::{amplify, detect_limited, lr_to_ms, ms_to_lr, peak_abs, rms, LimitedVerdict, EPS, LIMITED_MAXIMUM_POINT};
use crate::error::{MatchError, MatchResult};
use crate::events::{codes, Event, EventLevel, EventSink};
use crate::loader::{LoadedAudio, Loader};
use crate::saver::Saver;
use crate::types::{BitDepth, ProcessReport, ReferenceBundle, ResultSpec};

/// Linear-interpolation resampler used when a source's sample rate differs
/// from `internal_sample_rate`. Kept intentionally simple rather than
/// pulling in a dedicated resampling crate the rest of the pipeline has no
/// other use for.
fn resample_linear(channel: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || channel.is_empty() {
        return channel.to_vec();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = ((channel.len() as f64) * ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let lo = src_pos.floor() as usize;
        let hi = (lo + 1).min(channel.len() - 1);
        let frac = (src_pos - lo as f64) as f32;
        out.push(channel[lo.min(channel.len() - 1)] * (1.0 - frac) + channel[hi] * frac);
    }
    out
}

/// Promote a mono channel to stereo by duplication; pass stereo through
/// unchanged. Caller has already validated `pcm.len() <= 2`.
fn promote_mono_to_stereo(pcm: Vec<Vec<f32>>) -> (Vec<f32>, Vec<f32>, bool) {
    let mut it = pcm.into_iter();
    let first = it.next().unwrap_or_default();
    match it.next() {
        Some(second) => (first, second, false),
        None => (first.clone(), first, true),
    }
}

fn load_and_prepare(
    loader: &dyn Loader,
    path: &str,
    config: &Config,
    is_target: bool,
) -> MatchResult<(Vec<f32>, Vec<f32>, bool, bool)> {
    let LoadedAudio { pcm, sample_rate } = loader.load(path).map_err(|e| {
        if is_target {
            MatchError::TargetStream(e.to_string())
        } else {
            MatchError::ReferenceStream(e.to_string())
        }
    })?;

    let channels = pcm.len();
    if channels > 2 {
        return Err(if is_target {
            MatchError::TargetTooManyChannels { channels }
        } else {
            MatchError::ReferenceTooManyChannels { channels }
        });
    }

    let (left, right, was_mono) = promote_mono_to_stereo(pcm);

    let was_resampled = sample_rate != config.internal_sample_rate;
    let left = resample_linear(&left, sample_rate, config.internal_sample_rate);
    let right = resample_linear(&right, sample_rate, config.internal_sample_rate);

    let max_samples = (config.max_length_minutes * 60.0 * config.internal_sample_rate as f32) as usize;
    if left.len() > max_samples {
        let minutes = left.len() as f32 / 60.0 / config.internal_sample_rate as f32;
        return Err(if is_target {
            MatchError::TargetTooLong { minutes }
        } else {
            MatchError::ReferenceTooLong { minutes }
        });
    }
    if left.len() < config.fft_size {
        return Err(if is_target {
            MatchError::TargetTooShort {
                samples: left.len(),
                fft_size: config.fft_size,
            }
        } else {
            MatchError::ReferenceTooShort {
                samples: left.len(),
                fft_size: config.fft_size,
            }
        });
    }

    Ok((left, right, was_mono, was_resampled))
}

fn build_limiter_params(config: &Config) -> LimiterParams {
    LimiterParams::from_millis(
        config.limiter.threshold,
        config.limiter.lookahead_ms,
        config.limiter.attack_ms,
        config.limiter.release_ms,
        config.limiter.hold_ms,
        &config.limiter.smoothing_stages_ms,
        config.internal_sample_rate as f32,
    )
}

fn analyze_reference(left: &[f32], right: &[f32], config: &Config) -> MatchResult<ReferenceBundle> {
    let (mid, side) = lr_to_ms(left, right);
    let piece_size = config.piece_size_samples();

    let (loud_mid, loud_mid_rmses) = segment_and_select(&mid, piece_size);
    if loud_mid.is_empty() {
        return Err(MatchError::NoLoudPieces("REFERENCE Mid"));
    }
    let ref_matching_rms_m = rms(&loud_mid_rmses);
    let ref_matching_rms_s = {
        let (loud_side, loud_side_rmses) = segment_and_select(&side, piece_size);
        if loud_side.is_empty() {
            return Err(MatchError::NoLoudPieces("REFERENCE Side"));
        }
        rms(&loud_side_rmses)
    };

    let spectral = analyze_side(&mid, &side, &loud_mid, config.fft_size);

    Ok(ReferenceBundle {
        ref_matching_rms_m,
        ref_matching_rms_s,
        ref_avg_spectrum_m: spectral.mid,
        ref_avg_spectrum_s: spectral.side,
        ref_peak: peak_abs(left).max(peak_abs(right)),
        ref_sample_count: left.len(),
        internal_rate: config.internal_sample_rate,
        fft_size: config.fft_size,
        piece_size,
    })
}

fn render_preview(left: &[f32], right: &[f32], config: &Config) -> (Vec<f32>, Vec<f32>) {
    let piece_size = config.piece_size_samples().min(left.len().max(1));
    let (loud_pieces, loud_rmses) = segment_and_select(left, piece_size.max(1));

    let window_start = if loud_pieces.is_empty() || loud_rmses.is_empty() {
        0
    } else {
        let loudest_idx = loud_rmses
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0);
        loud_pieces[loudest_idx].0
    };

    let preview_len = config.preview_size.min(left.len());
    let start = window_start.min(left.len().saturating_sub(preview_len));
    let end = (start + preview_len).min(left.len());

    let mut out_l = left[start..end].to_vec();
    let mut out_r = right[start..end].to_vec();

    let fade = config.preview_crossfade_samples.min(out_l.len() / 2);
    for i in 0..fade {
        let g_in = i as f32 / fade.max(1) as f32;
        let g_out = 1.0 - g_in;
        out_l[i] *= g_in;
        out_r[i] *= g_in;
        let tail = out_l.len() - 1 - i;
        out_l[tail] *= g_out;
        out_r[tail] *= g_out;
    }

    (out_l, out_r)
}

/// Run the full reference-matching pipeline and write every requested
/// [`ResultSpec`].
pub fn process(
    target_source: &str,
    reference_source: &str,
    results: &[ResultSpec],
    config: &Config,
    loader: &dyn Loader,
    saver: &dyn Saver,
    cache: Option<&ReferenceCache>,
    sink: &mut dyn EventSink,
) -> MatchResult<ProcessReport> {
    config.validate()?;

    if target_source == reference_source {
        return Err(MatchError::TargetEqualsReference);
    }

    // Stage 0: load, resample, promote, validate.
    sink.emit(Event::new(codes::LOADING_AND_ANALYSIS, EventLevel::Info, "loading & analysis"));

    let (target_l, target_r, target_mono, target_resampled) = load_and_prepare(loader, target_source, config, true)?;
    if target_mono {
        sink.emit(Event::new(codes::TARGET_PROMOTED_MONO, EventLevel::Info, "TARGET was mono, promoted to stereo"));
    }
    if target_resampled {
        sink.emit(Event::new(codes::TARGET_RESAMPLED, EventLevel::Warning, "TARGET sample rate != internal rate; resampled"));
    }

    match detect_limited(&target_l, config.clipping_samples_threshold.0, config.clipping_samples_threshold.1) {
        LimitedVerdict::Clipping => sink.emit(Event::new(codes::CLIPPING_DETECTED, EventLevel::Warning, "TARGET clipping detected")),
        LimitedVerdict::Limited => sink.emit(Event::new(codes::LIMITED_SOURCE_DETECTED, EventLevel::Warning, "TARGET limiter detected")),
        LimitedVerdict::Clean => {}
    }

    let (reference_l, reference_r, reference_mono, reference_resampled) =
        load_and_prepare(loader, reference_source, config, false)?;
    if reference_mono {
        sink.emit(Event::new(codes::TARGET_PROMOTED_MONO, EventLevel::Info, "REFERENCE was mono, promoted to stereo"));
    }
    if reference_resampled {
        sink.emit(Event::new(codes::REFERENCE_RESAMPLED, EventLevel::Warning, "REFERENCE sample rate != internal rate; resampled"));
    }
    match detect_limited(&reference_l, config.clipping_samples_threshold.0, config.clipping_samples_threshold.1) {
        LimitedVerdict::Clipping => sink.emit(Event::new(codes::CLIPPING_DETECTED, EventLevel::Warning, "REFERENCE clipping detected")),
        LimitedVerdict::Limited => sink.emit(Event::new(codes::LIMITED_SOURCE_DETECTED, EventLevel::Warning, "REFERENCE limiter detected")),
        LimitedVerdict::Clean => {}
    }

    // Stage 0b: up-normalize REFERENCE for analysis if needed, and remember
    // the *restore* coefficient applied to Stage-4 output. The two are
    // inverses: analysis sees the REFERENCE scaled up to LIMITED_MAXIMUM_POINT
    // by `LMP/ref_peak` (>= 1 when ref_peak < LMP), but the finished output
    // must be scaled back down by `ref_peak/LMP` (<= 1) so the final peak
    // tracks the limiter threshold instead of the REFERENCE's original peak.
    let ref_peak = peak_abs(&reference_l).max(peak_abs(&reference_r));
    let mut final_amp_coef = 1.0f32;
    let (reference_l, reference_r) = if ref_peak < LIMITED_MAXIMUM_POINT && ref_peak > EPS {
        let analysis_gain = LIMITED_MAXIMUM_POINT / ref_peak;
        final_amp_coef = ref_peak / LIMITED_MAXIMUM_POINT;
        let mut l = reference_l;
        let mut r = reference_r;
        amplify(&mut l, analysis_gain);
        amplify(&mut r, analysis_gain);
        (l, r)
    } else {
        (reference_l, reference_r)
    };

    // Reference Statistics Cache lookup.
    let fp = fingerprint(
        &[reference_l.clone(), reference_r.clone()],
        config.internal_sample_rate,
        config.fft_size,
        config.piece_size_samples(),
        config.loess_span,
    );
    let (bundle, used_cached_reference) = match cache.and_then(|c| c.get(&fp)) {
        Some(bundle) => (bundle, true),
        None => {
            let bundle = analyze_reference(&reference_l, &reference_r, config)?;
            if let Some(c) = cache {
                let _ = c.put(&fp, &bundle);
            }
            (bundle, false)
        }
    };

    // Stage 1: matching levels.
    sink.emit(Event::new(codes::MATCHING_LEVELS, EventLevel::Info, "matching levels"));
    let (mut target_mid, mut target_side) = lr_to_ms(&target_l, &target_r);
    let piece_size = config.piece_size_samples();
    let (target_loud_pieces, target_loud_rmses) = segment_and_select(&target_mid, piece_size);
    if target_loud_pieces.is_empty() {
        return Err(MatchError::NoLoudPieces("TARGET Mid"));
    }

    let level_match = level::analyze(&target_loud_rmses, &{
        // Matching RMS for REFERENCE is already in the bundle; build a
        // one-element vector carrying that scalar so `level::analyze`'s
        // RMS-of-RMSes reduction is a no-op over a single value.
        vec![bundle.ref_matching_rms_m]
    });
    if level_match.target_was_silent {
        sink.emit(Event::new(codes::SILENCE_CLAMPED, EventLevel::Warning, "TARGET matching RMS below epsilon; clamped"));
    }
    amplify(&mut target_mid, level_match.rms_coefficient);
    amplify(&mut target_side, level_match.rms_coefficient);

    // Stage 2: matching frequencies.
    sink.emit(Event::new(codes::MATCHING_FREQUENCIES, EventLevel::Info, "matching frequencies"));
    let (target_loud_pieces, _) = segment_and_select(&target_mid, piece_size);
    if target_loud_pieces.is_empty() {
        return Err(MatchError::NoLoudPieces("TARGET Mid"));
    }
    let target_spectral = analyze_side(&target_mid, &target_side, &target_loud_pieces, config.fft_size);

    let fir_params = FirParams {
        n_fft: config.fft_size,
        sample_rate: config.internal_sample_rate as f32,
        oversampling: config.lin_log_oversampling,
        loess_span: config.loess_span,
        preserve_edge_bins: config.preserve_edge_bins,
    };
    let fir_mid = fir::synthesize(&target_spectral.mid, &bundle.ref_avg_spectrum_m, fir_params);
    let fir_side = fir::synthesize(&target_spectral.side, &bundle.ref_avg_spectrum_s, fir_params);

    let (mut stage2_l, mut stage2_r) = crate::dsp::convolve::convolve_and_recombine(&target_mid, &target_side, &fir_mid, &fir_side);

    // Stage 3: correcting levels.
    sink.emit(Event::new(codes::CORRECTING_LEVELS, EventLevel::Info, "correcting levels"));
    let limiter_params = build_limiter_params(config);
    let correction_history = correction::run(
        &mut stage2_l,
        &mut stage2_r,
        config.rms_correction_steps,
        piece_size,
        bundle.ref_matching_rms_m,
        &limiter_params,
    );

    // Stage 4: finalize & saving.
    sink.emit(Event::new(codes::FINALIZE_AND_SAVING, EventLevel::Info, "finalize & saving"));
    let mut outputs_written = Vec::with_capacity(results.len());
    for spec in results {
        let (mut out_l, mut out_r) = if spec.preview {
            render_preview(&stage2_l, &stage2_r, config)
        } else {
            (stage2_l.clone(), stage2_r.clone())
        };

        if spec.use_limiter {
            let (mid, side) = lr_to_ms(&out_l, &out_r);
            let mid_limited = limit(&mid, &limiter_params);
            let side_limited = limit(&side, &limiter_params);
            let (l, r) = ms_to_lr(&mid_limited, &side_limited);
            out_l = l;
            out_r = r;
        }

        amplify(&mut out_l, final_amp_coef);
        amplify(&mut out_r, final_amp_coef);

        if spec.normalize {
            let mut interleaved_peak = peak_abs(&out_l).max(peak_abs(&out_r));
            if interleaved_peak < EPS {
                interleaved_peak = 1.0;
            }
            let gain = LIMITED_MAXIMUM_POINT / interleaved_peak;
            amplify(&mut out_l, gain);
            amplify(&mut out_r, gain);
        }

        saver
            .save(&spec.path, &[out_l, out_r], config.internal_sample_rate, spec.bit_depth)
            .map_err(|e| MatchError::Internal(e.to_string()))?;
        outputs_written.push(spec.path.clone());
    }

    sink.emit(Event::new(codes::TASK_COMPLETE, EventLevel::Info, "task complete"));

    Ok(ProcessReport {
        outputs_written,
        final_amp_coef,
        rms_coefficient: level_match.rms_coefficient,
        correction_steps: correction_history.len(),
        used_cached_reference,
    })
}

/// Thin convenience wrapper for the common single-output call shape, using
/// the default [`crate::loader::WavLoader`] and [`crate::saver::WavSaver`]
/// and no cache.
pub fn process_to_wav(
    target_source: &str,
    reference_source: &str,
    output_path: &str,
    bit_depth: BitDepth,
    config: &Config,
    sink: &mut dyn EventSink,
) -> MatchResult<ProcessReport> {
    let loader = crate::loader::WavLoader;
    let saver = crate::saver::WavSaver;
    let results = vec![ResultSpec::full(output_path, bit_depth)];
    process(target_source, reference_source, &results, config, &loader, &saver, None, sink)
}
