//! Decode counters shared between decoding threads
//!
//! # Design Principles (KISS)
//! - Lock-free atomic counters, Relaxed ordering
//! - Simple snapshot mechanism for reporting

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters summed over every decode call
///
/// Typically shared through an `Arc` by the threads decoding distinct
/// modules. Statistics are eventually consistent.
#[derive(Debug, Default)]
pub struct DecodeCounters {
    /// `load_slot` calls
    pub calls: AtomicU64,
    /// Words examined
    pub words: AtomicU64,
    /// Values stored in module buffers
    pub stored: AtomicU64,
    /// Values dropped (capacity or channel range)
    pub dropped: AtomicU64,
    /// Diagnostics recorded
    pub diagnostics: AtomicU64,
    /// Calls aborted by a sink rejection
    pub sink_rejections: AtomicU64,
}

impl DecodeCounters {
    /// Create new zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_words(&self, n: u64) {
        self.words.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_stored(&self, n: u64) {
        self.stored.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_diagnostics(&self, n: u64) {
        self.diagnostics.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn inc_sink_rejections(&self) {
        self.sink_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current values
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            words: self.words.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            diagnostics: self.diagnostics.load(Ordering::Relaxed),
            sink_rejections: self.sink_rejections.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.words.store(0, Ordering::Relaxed);
        self.stored.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.diagnostics.store(0, Ordering::Relaxed);
        self.sink_rejections.store(0, Ordering::Relaxed);
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub calls: u64,
    pub words: u64,
    pub stored: u64,
    pub dropped: u64,
    pub diagnostics: u64,
    pub sink_rejections: u64,
}

impl CounterSnapshot {
    /// Words per second given the elapsed time
    pub fn word_rate(&self, elapsed_secs: f64) -> f64 {
        if elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.words as f64 / elapsed_secs
    }

    /// Format word rate as human-readable string (K/s, M/s)
    pub fn format_word_rate(&self, elapsed_secs: f64) -> String {
        let rate = self.word_rate(elapsed_secs);
        if rate >= 1_000_000.0 {
            format!("{:.2} M words/s", rate / 1_000_000.0)
        } else if rate >= 1_000.0 {
            format!("{:.2} K words/s", rate / 1_000.0)
        } else {
            format!("{:.0} words/s", rate)
        }
    }
}
