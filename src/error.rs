//! Error taxonomy for the matching engine.
//!
//! Every variant carries the four-digit event code from the frozen table in
//! the process API contract (2xxx info / 3xxx warning / 4xxx error — only
//! the 4xxx family is ever returned here; 3xxx warnings are clamped locally
//! and only ever reach the caller through the [`crate::events::EventSink`]).

use thiserror::Error;

/// All failure modes the core can report back to a caller.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("[4001] failed to read TARGET stream: {0}")]
    TargetStream(String),

    #[error("[4002] TARGET exceeds max_length_minutes ({minutes} min)")]
    TargetTooLong { minutes: f32 },

    #[error("[4003] TARGET is shorter than the FFT window ({samples} samples < {fft_size})")]
    TargetTooShort { samples: usize, fft_size: usize },

    #[error("[4004] TARGET has more than 2 channels ({channels})")]
    TargetTooManyChannels { channels: usize },

    #[error("[4005] TARGET and REFERENCE are the same file")]
    TargetEqualsReference,

    #[error("[4101] failed to read REFERENCE stream: {0}")]
    ReferenceStream(String),

    #[error("[4102] REFERENCE exceeds max_length_minutes ({minutes} min)")]
    ReferenceTooLong { minutes: f32 },

    #[error("[4103] REFERENCE is shorter than the FFT window ({samples} samples < {fft_size})")]
    ReferenceTooShort { samples: usize, fft_size: usize },

    #[error("[4104] REFERENCE has more than 2 channels ({channels})")]
    ReferenceTooManyChannels { channels: usize },

    #[error("[4202] invalid configuration: {0}")]
    Configuration(String),

    #[error("[4202] internal invariant violated: {0}")]
    Internal(String),

    #[error("[4202] no piece met the loud-piece threshold for {0}")]
    NoLoudPieces(&'static str),

    #[error("[4201] cancelled by caller")]
    Cancelled,

    #[error("[4201] unknown error: {0}")]
    Unknown(String),
}

impl MatchError {
    /// The frozen four-digit event code associated with this error.
    pub fn code(&self) -> u32 {
        match self {
            MatchError::TargetStream(_) => 4001,
            MatchError::TargetTooLong { .. } => 4002,
            MatchError::TargetTooShort { .. } => 4003,
            MatchError::TargetTooManyChannels { .. } => 4004,
            MatchError::TargetEqualsReference => 4005,
            MatchError::ReferenceStream(_) => 4101,
            MatchError::ReferenceTooLong { .. } => 4102,
            MatchError::ReferenceTooShort { .. } => 4103,
            MatchError::ReferenceTooManyChannels { .. } => 4104,
            MatchError::Configuration(_) => 4202,
            MatchError::Internal(_) => 4202,
            MatchError::NoLoudPieces(_) => 4202,
            MatchError::Cancelled => 4201,
            MatchError::Unknown(_) => 4201,
        }
    }
}

pub type MatchResult<T> = Result<T, MatchError>;
