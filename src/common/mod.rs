//! Common types shared across the crate
//!
//! Error types, decode counters and CLI arguments.

pub mod cli;
pub mod error;
pub mod metrics;

pub use error::{DecodeError, DecodeResult, SinkError};
pub use metrics::{CounterSnapshot, DecodeCounters};
