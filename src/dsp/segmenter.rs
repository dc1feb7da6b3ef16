//! Segmenter (C2).
//!
//! Splits a channel into fixed-size, non-overlapping pieces and selects the
//! subset whose RMS meets or exceeds the RMS-of-piece-RMSes threshold (not
//! the mean — the threshold is itself an RMS, computed over piece RMSes).
//! Trailing samples that don't fill a whole piece are excluded from
//! analysis but are never truncated from the signal the caller keeps for
//! output.

use crate::dsp::utils::rms;

/// A contiguous analysis window `[start, end)` into the owning channel.
pub type PieceBounds = (usize, usize);

/// Split `len` samples into `piece_size`-sample pieces, discarding any
/// trailing remainder. When the channel is shorter than one piece (e.g. a
/// TARGET of exactly `N_FFT` samples against the default ~15 s piece size),
/// the whole channel becomes a single piece instead of yielding zero pieces
/// — a channel that already cleared the Stage-0 length gate must still
/// produce at least one analysis window.
pub fn segment(len: usize, piece_size: usize) -> Vec<PieceBounds> {
    if piece_size == 0 || len == 0 {
        return Vec::new();
    }
    let effective = piece_size.min(len);
    let count = len / effective;
    (0..count)
        .map(|i| (i * effective, (i + 1) * effective))
        .collect()
}

/// Per-piece RMS for every piece boundary, in order.
pub fn piece_rmses(channel: &[f32], pieces: &[PieceBounds]) -> Vec<f32> {
    pieces
        .iter()
        .map(|&(s, e)| rms(&channel[s..e]))
        .collect()
}

/// Admit every piece whose RMS is `>=` the RMS of all piece RMSes (spec
/// §4.2). Guaranteed non-empty for any non-empty `pieces` because the
/// threshold can never exceed the maximum piece RMS.
pub fn select_loud(pieces: &[PieceBounds], rmses: &[f32]) -> Vec<PieceBounds> {
    debug_assert_eq!(pieces.len(), rmses.len());
    if rmses.is_empty() {
        return Vec::new();
    }
    let threshold = rms(rmses);
    pieces
        .iter()
        .zip(rmses.iter())
        .filter(|&(_, &r)| r >= threshold)
        .map(|(&p, _)| p)
        .collect()
}

/// Convenience: segment + compute RMSes + select loud pieces in one call.
pub fn segment_and_select(channel: &[f32], piece_size: usize) -> (Vec<PieceBounds>, Vec<f32>) {
    let pieces = segment(channel.len(), piece_size);
    let rmses = piece_rmses(channel, &pieces);
    let loud = select_loud(&pieces, &rmses);
    let loud_rmses = piece_rmses(channel, &loud);
    (loud, loud_rmses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_discards_trailing_remainder() {
        let pieces = segment(1000, 300);
        assert_eq!(pieces, vec![(0, 300), (300, 600), (600, 900)]);
    }

    #[test]
    fn segment_zero_piece_size_is_empty() {
        assert!(segment(1000, 0).is_empty());
    }

    #[test]
    fn segment_shorter_than_piece_size_yields_one_whole_piece() {
        // e.g. a TARGET of exactly N_FFT samples against a much larger
        // default piece size: must still produce exactly one piece, not zero.
        let pieces = segment(32768, 661_500);
        assert_eq!(pieces, vec![(0, 32768)]);
    }

    #[test]
    fn at_least_one_piece_is_always_admitted() {
        // Every piece has the same RMS: threshold == each piece's RMS, all admitted.
        let channel = vec![0.5f32; 3000];
        let pieces = segment(channel.len(), 1000);
        let rmses = piece_rmses(&channel, &pieces);
        let loud = select_loud(&pieces, &rmses);
        assert_eq!(loud.len(), 3);
    }

    #[test]
    fn quiet_intro_is_excluded() {
        let mut channel = vec![0.0f32; 0];
        channel.extend(vec![0.001f32; 1000]); // quiet intro piece
        channel.extend(vec![0.5f32; 1000]); // loud piece
        channel.extend(vec![0.5f32; 1000]); // loud piece
        let pieces = segment(channel.len(), 1000);
        let rmses = piece_rmses(&channel, &pieces);
        let loud = select_loud(&pieces, &rmses);
        assert_eq!(loud.len(), 2);
        assert_eq!(loud[0], (1000, 2000));
    }

    #[test]
    fn ties_are_admitted() {
        let channel = vec![0.2f32; 2000];
        let pieces = segment(channel.len(), 1000);
        let rmses = piece_rmses(&channel, &pieces);
        let loud = select_loud(&pieces, &rmses);
        assert_eq!(loud.len(), 2);
    }
}
