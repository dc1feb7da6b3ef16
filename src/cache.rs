//! Reference Statistics Cache (C9).
//!
//! A content-addressed directory of serialized [`ReferenceBundle`]s keyed
//! by a fingerprint over the REFERENCE's decoded PCM plus every analysis
//! parameter that would change the bundle's contents. Advisory: a miss, a
//! corrupt entry, or an unwritable directory never aborts the pipeline —
//! they just mean the REFERENCE gets re-analyzed.

use std::fs;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use crate::types::ReferenceBundle;

/// Compute the fingerprint for a REFERENCE analysis: `hash(PCM bytes ||
/// internal_rate || fft_size || piece_size || loess_span)`.
pub fn fingerprint(pcm: &[Vec<f32>], internal_rate: u32, fft_size: usize, piece_size: usize, loess_span: f32) -> String {
    let mut bytes = Vec::with_capacity(pcm.iter().map(|c| c.len() * 4).sum::<usize>() + 32);
    for channel in pcm {
        for &s in channel {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
    }
    bytes.extend_from_slice(&internal_rate.to_le_bytes());
    bytes.extend_from_slice(&(fft_size as u64).to_le_bytes());
    bytes.extend_from_slice(&(piece_size as u64).to_le_bytes());
    bytes.extend_from_slice(&loess_span.to_le_bytes());

    format!("{:016x}", xxh3_64(&bytes))
}

/// Content-addressed store of [`ReferenceBundle`]s under a single directory.
pub struct ReferenceCache {
    dir: PathBuf,
}

impl ReferenceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, fingerprint: &str) -> PathBuf {
        self.dir.join(format!("{fingerprint}.json"))
    }

    /// Best-effort lookup. Any I/O or deserialization failure is treated as
    /// a miss rather than propagated — the cache is advisory.
    pub fn get(&self, fingerprint: &str) -> Option<ReferenceBundle> {
        let path = self.entry_path(fingerprint);
        let data = fs::read(path).ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Write-to-temp-then-rename so concurrent writers of the same
    /// fingerprint never observe a partial file
    /// policy). Failures are logged by the caller via the event sink, not
    /// raised, since the cache is advisory.
    pub fn put(&self, fingerprint: &str, bundle: &ReferenceBundle) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let final_path = self.entry_path(fingerprint);
        let tmp_path = self.dir.join(format!("{fingerprint}.json.tmp-{}", std::process::id()));

        let data = serde_json::to_vec(bundle).map_err(std::io::Error::other)?;
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Evict entries until at most `max_entries` remain, oldest (by
    /// modification time) first. Advisory helper; errors are swallowed —
    /// the cache directory is safe to delete externally too.
    pub fn prune(&self, max_entries: usize) {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return;
        };

        let mut entries: Vec<(PathBuf, std::time::SystemTime)> = read_dir
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                Some((e.path(), modified))
            })
            .collect();

        if entries.len() <= max_entries {
            return;
        }

        entries.sort_by_key(|&(_, modified)| modified);
        let remove_count = entries.len() - max_entries;
        for (path, _) in entries.into_iter().take(remove_count) {
            let _ = fs::remove_file(path);
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bundle() -> ReferenceBundle {
        ReferenceBundle {
            ref_matching_rms_m: 0.2,
            ref_matching_rms_s: 0.05,
            ref_avg_spectrum_m: vec![1.0; 16],
            ref_avg_spectrum_s: vec![0.5; 16],
            ref_peak: 0.99,
            ref_sample_count: 44100 * 30,
            internal_rate: 44100,
            fft_size: 32768,
            piece_size: 44100 * 15,
        }
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive_to_params() {
        let pcm = vec![vec![0.1f32, 0.2, -0.1], vec![0.1f32, 0.2, -0.1]];
        let a = fingerprint(&pcm, 44100, 32768, 661500, 0.075);
        let b = fingerprint(&pcm, 44100, 32768, 661500, 0.075);
        let c = fingerprint(&pcm, 48000, 32768, 661500, 0.075);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn put_then_get_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ReferenceCache::new(tmp.path());
        let bundle = sample_bundle();
        cache.put("abc123", &bundle).unwrap();
        let loaded = cache.get("abc123").expect("entry should be present");
        assert_eq!(loaded.ref_peak, bundle.ref_peak);
        assert_eq!(loaded.ref_avg_spectrum_m, bundle.ref_avg_spectrum_m);
    }

    #[test]
    fn miss_returns_none_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ReferenceCache::new(tmp.path());
        assert!(cache.get("does-not-exist").is_none());
    }

    #[test]
    fn prune_keeps_only_newest_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ReferenceCache::new(tmp.path());
        for i in 0..5 {
            cache.put(&format!("fp{i}"), &sample_bundle()).unwrap();
        }
        cache.prune(2);
        let remaining = fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(remaining, 2);
    }
}
