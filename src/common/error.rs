//! Common error types for VME decoding
//!
//! # Design Principles (KISS)
//! - Only a sink rejection is fatal to a decode call
//! - Malformed streams, full buffers and bad channels never produce an error
//! - Use thiserror for ergonomic error handling

use thiserror::Error;

/// Errors a slot data sink may report for a submitted value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink has no room left for another value
    #[error("slot data full: {max} values already stored")]
    Full { max: usize },

    /// The sink does not accept data for this channel
    #[error("channel {0} not accepted by slot data")]
    ChannelRejected(u32),

    /// Generic rejection with message
    #[error("{0}")]
    Other(String),
}

impl SinkError {
    /// Create a generic rejection
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Fatal decode failures
///
/// The remainder of the word stream is discarded when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The slot data sink refused a decoded value
    #[error("sink rejected {kind} value on channel {channel} at word {words_seen}: {source}")]
    SinkRejected {
        kind: &'static str,
        channel: u32,
        /// Words examined, including the rejected one
        words_seen: usize,
        #[source]
        source: SinkError,
    },
}

impl DecodeError {
    /// Number of words examined before the call was aborted
    pub fn words_seen(&self) -> usize {
        match self {
            Self::SinkRejected { words_seen, .. } => *words_seen,
        }
    }
}

/// Result type alias using DecodeError
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_full_error() {
        let err = SinkError::Full { max: 16 };
        assert!(err.to_string().contains("full"));
        assert!(err.to_string().contains("16"));
    }

    #[test]
    fn test_sink_other_error() {
        let err = SinkError::other("crate offline");
        assert_eq!(err.to_string(), "crate offline");
    }

    #[test]
    fn test_sink_rejected_display() {
        let err = DecodeError::SinkRejected {
            kind: "tdc",
            channel: 7,
            words_seen: 3,
            source: SinkError::ChannelRejected(7),
        };
        let msg = err.to_string();
        assert!(msg.contains("tdc"));
        assert!(msg.contains("channel 7"));
        assert_eq!(err.words_seen(), 3);
    }

    #[test]
    fn test_sink_rejected_source() {
        use std::error::Error as _;
        let err = DecodeError::SinkRejected {
            kind: "adc",
            channel: 1,
            words_seen: 10,
            source: SinkError::Full { max: 4 },
        };
        assert!(err.source().is_some());
    }
}
