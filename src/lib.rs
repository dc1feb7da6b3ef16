//! Reference-matching mastering engine.
//!
//! Given a TARGET mix and a REFERENCE track, [`orchestrator::process`]
//! produces a mastered TARGET whose loudness, spectral balance, peak level
//! and stereo width statistically match the REFERENCE: Mid/Side level
//! matching, FFT-based spectral ratio matching via a smoothed linear-phase
//! FIR, an iterative RMS correction loop, and a look-ahead brickwall
//! limiter ("Hyrax") for the final safety ceiling.
//!
//! The pipeline is synchronous and single-threaded from the caller's
//! perspective (one `process()` call runs the stages in order); progress
//! and diagnostics flow through an injected [`events::EventSink`] rather
//! than being printed or logged directly, so callers can wire it to a CLI,
//! a GUI, or nothing at all.

pub mod cache;
pub mod config;
pub mod dsp;
pub mod error;
pub mod events;
pub mod loader;
pub mod orchestrator;
pub mod saver;
pub mod types;

pub use cache::ReferenceCache;
pub use config::{Config, LimiterConfig};
pub use error::{MatchError, MatchResult};
pub use events::{DiscardSink, Event, EventLevel, EventSink, LogSink, VecSink};
pub use loader::{Loader, WavLoader};
pub use orchestrator::{process, process_to_wav};
pub use saver::{Saver, WavSaver};
pub use types::{BitDepth, ProcessReport, ReferenceBundle, ResultSpec, StereoBuffer};
