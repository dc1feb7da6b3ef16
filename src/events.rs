//! Progress / diagnostic event sink.
//!
//! This is the one presentation surface the core owns directly :
//! a strictly stage-ordered sequence of `{code, level, message}` triples.
//! Everything else — CLI output, GUI progress bars, structured log
//! shipping — is the caller's problem; we just call `emit` at the right
//! times and keep the code table frozen.

use std::fmt;

/// Severity of an emitted event. Mirrors the code-family convention
/// (2xxx/3xxx/4xxx) without forcing callers to parse the code themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single progress/diagnostic event.
#[derive(Debug, Clone)]
pub struct Event {
    pub code: u32,
    pub level: EventLevel,
    pub message: String,
}

impl Event {
    pub fn new(code: u32, level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            code,
            level,
            message: message.into(),
        }
    }
}

/// Consumer of pipeline progress events.
///
/// Implementations MUST NOT block for long periods — the Orchestrator calls
/// this synchronously from the processing thread. Events arrive in strict
/// stage order ; a sink that reorders or drops events silently
/// breaks that guarantee for its caller, not for the core.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// Default sink: discards everything. Used when the caller passes none.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl EventSink for DiscardSink {
    fn emit(&mut self, _event: Event) {}
}

/// Sink that accumulates events in memory, useful for tests and for callers
/// that want to inspect the whole run after the fact rather than streaming.
#[derive(Debug, Default, Clone)]
pub struct VecSink(pub Vec<Event>);

impl EventSink for VecSink {
    fn emit(&mut self, event: Event) {
        self.0.push(event);
    }
}

/// Sink that forwards every event through the `log` facade at the level
/// matching [`EventLevel`]. Useful as a quick default for CLI integrators.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: Event) {
        match event.level {
            EventLevel::Info => log::info!("[{}] {}", event.code, event.message),
            EventLevel::Warning => log::warn!("[{}] {}", event.code, event.message),
            EventLevel::Error => log::error!("[{}] {}", event.code, event.message),
        }
    }
}

// Frozen code table excerpt . Kept centralized so stage code never
// hand-rolls magic numbers inline.
pub mod codes {
    pub const LOADING_AND_ANALYSIS: u32 = 2003;
    pub const MATCHING_LEVELS: u32 = 2004;
    pub const MATCHING_FREQUENCIES: u32 = 2005;
    pub const CORRECTING_LEVELS: u32 = 2006;
    pub const FINALIZE_AND_SAVING: u32 = 2007;
    pub const TASK_COMPLETE: u32 = 2010;

    pub const TARGET_PROMOTED_MONO: u32 = 2101;
    pub const REFERENCE_RESAMPLED: u32 = 2202;

    /// Clipping-detected warning. Reused verbatim for REFERENCE; the
    /// message text distinguishes which side triggered it.
    pub const CLIPPING_DETECTED: u32 = 3001;
    /// Limiting-detected warning. Reused verbatim for REFERENCE.
    pub const LIMITED_SOURCE_DETECTED: u32 = 3002;
    pub const TARGET_RESAMPLED: u32 = 3003;

    pub const SILENCE_CLAMPED: u32 = 3901;
}
