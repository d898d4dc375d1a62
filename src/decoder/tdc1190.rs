//! CAEN V1190 multi-hit TDC decoder
//!
//! Decodes the 32-bit output buffer words of the V1190 (and V1290) TDC.
//!
//! # Data Format
//!
//! The word kind lives in bits 31..27:
//! Global Header → (Chip Header → Measurements → Chip Trailer)* → Global Trailer
//!
//! - Filler words pad the buffer and carry no data
//! - Error words may appear anywhere and do not end the event
//! - Decoding stops at the global trailer or at the end of the slice

use serde::Serialize;
use tracing::debug;

use super::classify::{classify, WordRule};
use super::common::{Capability, Diagnostic, DiagnosticLog, ModuleAddress, RawWord};
use super::hit_buffer::{ChannelHitBuffer, PushOutcome};
use crate::common::{DecodeError, DecodeResult};
use crate::slot_data::SlotSink;

/// Registry type id of the V1190
pub const TYPE_ID: u32 = 1190;
/// Number of TDC channels
pub const TDC_CHANNELS: usize = 128;
/// Hits kept per channel and event
pub const TDC_MAX_HITS: usize = 100;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

mod constants {
    pub const KIND_MASK: u32 = 0xF800_0000;

    pub const FILLER: u32 = 0xC000_0000;
    pub const GLOBAL_HEADER: u32 = 0x4000_0000;
    pub const CHIP_HEADER: u32 = 0x0800_0000;
    pub const MEASUREMENT: u32 = 0x0000_0000;
    pub const CHIP_TRAILER: u32 = 0x1800_0000;
    pub const GLOBAL_TRAILER: u32 = 0x8000_0000;
    pub const ERROR: u32 = 0x2000_0000;

    pub mod global_header {
        pub const EVENT_SHIFT: u32 = 5;
        pub const EVENT_MASK: u32 = 0x3F_FFFF; // bits 26-5
        pub const SLOT_MASK: u32 = 0x1F;
    }

    pub mod chip {
        pub const CHIP_SHIFT: u32 = 24;
        pub const CHIP_MASK: u32 = 0x3; // bits 25-24
    }

    pub mod measurement {
        pub const CHANNEL_SHIFT: u32 = 19;
        pub const CHANNEL_MASK: u32 = 0x7F; // bits 25-19
        pub const VALUE_MASK: u32 = 0x7_FFFF; // bits 18-0
    }

    pub mod error {
        pub const FLAGS_MASK: u32 = 0x7FFF;
    }

    pub mod global_trailer {
        pub const STATUS_SHIFT: u32 = 24;
        pub const STATUS_MASK: u32 = 0x7; // bits 26-24
        pub const SLOT_MASK: u32 = 0x1F;
    }
}

/// Kind of a V1190 output buffer word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TdcWordKind {
    Filler,
    GlobalHeader,
    ChipHeader,
    Measurement,
    ChipTrailer,
    GlobalTrailer,
    ErrorFlag,
    Unknown,
}

const RULES: [WordRule<TdcWordKind>; 7] = [
    WordRule::new(constants::KIND_MASK, constants::FILLER, TdcWordKind::Filler),
    WordRule::new(
        constants::KIND_MASK,
        constants::GLOBAL_HEADER,
        TdcWordKind::GlobalHeader,
    ),
    WordRule::new(
        constants::KIND_MASK,
        constants::CHIP_HEADER,
        TdcWordKind::ChipHeader,
    ),
    WordRule::new(
        constants::KIND_MASK,
        constants::MEASUREMENT,
        TdcWordKind::Measurement,
    ),
    WordRule::new(
        constants::KIND_MASK,
        constants::CHIP_TRAILER,
        TdcWordKind::ChipTrailer,
    ),
    WordRule::new(
        constants::KIND_MASK,
        constants::GLOBAL_TRAILER,
        TdcWordKind::GlobalTrailer,
    ),
    WordRule::new(constants::KIND_MASK, constants::ERROR, TdcWordKind::ErrorFlag),
];

/// Classify a V1190 word
pub fn classify_word(word: RawWord) -> TdcWordKind {
    classify(word, &RULES, TdcWordKind::Unknown)
}

// ---------------------------------------------------------------------------
// V1190 Configuration & Decoder
// ---------------------------------------------------------------------------

/// V1190 decoder configuration
#[derive(Debug, Clone)]
pub struct Tdc1190Config {
    /// Number of channels with hit storage
    pub channels: usize,
    /// Maximum hits stored per channel
    pub max_hits: usize,
    /// Emit diagnostics through tracing
    pub log_diagnostics: bool,
}

impl Default for Tdc1190Config {
    fn default() -> Self {
        Self {
            channels: TDC_CHANNELS,
            max_hits: TDC_MAX_HITS,
            log_diagnostics: true,
        }
    }
}

/// Decoder state and hit storage for one V1190 module
#[derive(Debug, Clone)]
pub struct Tdc1190Module {
    address: ModuleAddress,
    hits: ChannelHitBuffer,
    diagnostics: DiagnosticLog,
    words_seen: usize,
    event_number: u32,
    slot: Option<u32>,
    chip_header: Option<u32>,
    done: bool,
    dropped_hits: usize,
    out_of_range: usize,
}

impl Tdc1190Module {
    pub const NAME: &'static str = "Caen TDC 1190 Module";

    pub fn new(address: ModuleAddress, config: Tdc1190Config) -> Self {
        Self {
            address,
            hits: ChannelHitBuffer::new(config.channels, config.max_hits),
            diagnostics: DiagnosticLog::new(config.log_diagnostics),
            words_seen: 0,
            event_number: 0,
            slot: None,
            chip_header: None,
            done: false,
            dropped_hits: 0,
            out_of_range: 0,
        }
    }

    /// Create a module with the default channel count and hit capacity
    pub fn with_defaults(address: ModuleAddress) -> Self {
        Self::new(address, Tdc1190Config::default())
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Reset hit storage and decode state
    pub fn clear(&mut self) {
        self.hits.clear();
        self.diagnostics.clear();
        self.words_seen = 0;
        self.event_number = 0;
        self.slot = None;
        self.chip_header = None;
        self.done = false;
        self.dropped_hits = 0;
        self.out_of_range = 0;
    }

    /// Decode one event's words
    ///
    /// Stops after the global trailer or at the end of `words`. Returns the
    /// number of words examined, including the trailer. Hits are appended to
    /// whatever the buffers already hold; call [`clear`](Self::clear) first
    /// to start a new event.
    pub fn load_slot(&mut self, sink: &mut dyn SlotSink, words: &[RawWord]) -> DecodeResult<usize> {
        self.words_seen = 0;
        self.done = false;

        for &word in words {
            self.words_seen += 1;
            match classify_word(word) {
                TdcWordKind::Filler => {}
                TdcWordKind::GlobalHeader => self.decode_global_header(word),
                TdcWordKind::ChipHeader => {
                    self.chip_header = Some(chip_number(word));
                }
                TdcWordKind::Measurement => self.decode_measurement(sink, word)?,
                TdcWordKind::ChipTrailer => self.decode_chip_trailer(word),
                TdcWordKind::ErrorFlag => {
                    let diagnostic = Diagnostic::TdcError {
                        slot: self.slot.unwrap_or(self.address.slot),
                        chip: chip_number(word),
                        flags: word & constants::error::FLAGS_MASK,
                        event: self.event_number,
                    };
                    self.report(diagnostic);
                }
                TdcWordKind::GlobalTrailer => {
                    self.decode_global_trailer(word);
                    self.done = true;
                    break;
                }
                TdcWordKind::Unknown => {
                    let diagnostic = Diagnostic::UnknownWord {
                        word,
                        event: self.event_number,
                    };
                    self.report(diagnostic);
                }
            }
        }

        debug!(
            slot = self.address.slot,
            words = self.words_seen,
            hits = self.hits.total_hits(),
            done = self.done,
            "TDC1190 load_slot finished"
        );

        Ok(self.words_seen)
    }

    /// Raw value of a hit, or 0 when there is no such hit
    pub fn data(&self, channel: usize, hit: usize) -> u32 {
        self.hits.get(channel, hit)
    }

    pub fn num_hits(&self, channel: usize) -> usize {
        self.hits.num_hits(channel)
    }

    pub fn hits(&self) -> &ChannelHitBuffer {
        &self.hits
    }

    pub fn address(&self) -> ModuleAddress {
        self.address
    }

    /// Words examined by the last decode call
    pub fn words_seen(&self) -> usize {
        self.words_seen
    }

    /// Event number from the last global header
    pub fn event_number(&self) -> u32 {
        self.event_number
    }

    /// Slot number from the last global header
    pub fn slot_from_data(&self) -> Option<u32> {
        self.slot
    }

    /// Whether the last decode call reached a global trailer
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Hits lost because a channel was full
    pub fn dropped_hits(&self) -> usize {
        self.dropped_hits
    }

    /// Hits ignored because their channel does not exist
    pub fn out_of_range_hits(&self) -> usize {
        self.out_of_range
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn is_multi_function(&self) -> bool {
        false
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        capability == Capability::MultiHitTdc
    }

    pub fn snapshot(&self) -> TdcSnapshot {
        TdcSnapshot {
            address: self.address,
            event_number: self.event_number,
            words_seen: self.words_seen,
            done: self.done,
            dropped_hits: self.dropped_hits,
            channels: self
                .hits
                .channels_with_hits()
                .map(|(channel, hits)| ChannelHits {
                    channel,
                    hits: hits.to_vec(),
                })
                .collect(),
            diagnostics: self.diagnostics.entries().to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Word handlers
    // -----------------------------------------------------------------------

    fn decode_global_header(&mut self, word: RawWord) {
        self.event_number = (word >> constants::global_header::EVENT_SHIFT)
            & constants::global_header::EVENT_MASK;
        self.slot = Some(word & constants::global_header::SLOT_MASK);
    }

    fn decode_measurement(&mut self, sink: &mut dyn SlotSink, word: RawWord) -> DecodeResult<()> {
        let channel =
            (word >> constants::measurement::CHANNEL_SHIFT) & constants::measurement::CHANNEL_MASK;
        let raw = word & constants::measurement::VALUE_MASK;

        sink.submit("tdc", channel, raw, raw)
            .map_err(|source| DecodeError::SinkRejected {
                kind: "tdc",
                channel,
                words_seen: self.words_seen,
                source,
            })?;

        match self.hits.push(channel as usize, raw) {
            PushOutcome::Stored => {}
            PushOutcome::Dropped => self.dropped_hits += 1,
            PushOutcome::OutOfRange => self.out_of_range += 1,
        }
        Ok(())
    }

    fn decode_chip_trailer(&mut self, word: RawWord) {
        let trailer = chip_number(word);
        if let Some(header) = self.chip_header.take() {
            if header != trailer {
                let diagnostic = Diagnostic::ChipMismatch {
                    header,
                    trailer,
                    event: self.event_number,
                };
                self.report(diagnostic);
            }
        }
    }

    fn decode_global_trailer(&mut self, word: RawWord) {
        let status = (word >> constants::global_trailer::STATUS_SHIFT)
            & constants::global_trailer::STATUS_MASK;
        if status != 0 {
            let diagnostic = Diagnostic::TrailerStatus {
                status,
                event: self.event_number,
            };
            self.report(diagnostic);
        }

        let trailer_slot = word & constants::global_trailer::SLOT_MASK;
        if let Some(header_slot) = self.slot {
            if header_slot != trailer_slot {
                let diagnostic = Diagnostic::TrailerSlotMismatch {
                    header: header_slot,
                    trailer: trailer_slot,
                    event: self.event_number,
                };
                self.report(diagnostic);
            }
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics
            .report("TDC1190", self.address, diagnostic);
    }
}

/// Hits of one channel in a [`TdcSnapshot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHits {
    pub channel: usize,
    pub hits: Vec<u32>,
}

/// Serializable view of a decoded V1190 event
#[derive(Debug, Clone, Serialize)]
pub struct TdcSnapshot {
    pub address: ModuleAddress,
    pub event_number: u32,
    pub words_seen: usize,
    pub done: bool,
    pub dropped_hits: usize,
    pub channels: Vec<ChannelHits>,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

#[inline]
fn chip_number(word: RawWord) -> u32 {
    (word >> constants::chip::CHIP_SHIFT) & constants::chip::CHIP_MASK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::SinkError;
    use crate::slot_data::{NullSink, SlotData};

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    fn global_header(event: u32, slot: u32) -> u32 {
        0x4000_0000 | ((event & 0x3F_FFFF) << 5) | (slot & 0x1F)
    }

    fn global_trailer(slot: u32) -> u32 {
        0x8000_0000 | (slot & 0x1F)
    }

    fn measurement(channel: u32, value: u32) -> u32 {
        ((channel & 0x7F) << 19) | (value & 0x7_FFFF)
    }

    fn chip_header(chip: u32) -> u32 {
        0x0800_0000 | ((chip & 0x3) << 24)
    }

    fn chip_trailer(chip: u32) -> u32 {
        0x1800_0000 | ((chip & 0x3) << 24)
    }

    fn error_word(chip: u32, flags: u32) -> u32 {
        0x2000_0000 | ((chip & 0x3) << 24) | (flags & 0x7FFF)
    }

    fn module() -> Tdc1190Module {
        Tdc1190Module::new(
            ModuleAddress::new(1, 3),
            Tdc1190Config {
                log_diagnostics: false,
                ..Default::default()
            },
        )
    }

    /// Sink that rejects every submission after `accept` values
    struct RejectAfter {
        accept: usize,
        seen: usize,
    }

    impl SlotSink for RejectAfter {
        fn submit(&mut self, _: &str, _: u32, _: u32, _: u32) -> Result<(), SinkError> {
            if self.seen >= self.accept {
                return Err(SinkError::other("rejected"));
            }
            self.seen += 1;
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // classify tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_classify_kinds() {
        assert_eq!(classify_word(0xC000_0000), TdcWordKind::Filler);
        assert_eq!(classify_word(global_header(5, 3)), TdcWordKind::GlobalHeader);
        assert_eq!(classify_word(chip_header(2)), TdcWordKind::ChipHeader);
        assert_eq!(classify_word(measurement(10, 0x1234)), TdcWordKind::Measurement);
        assert_eq!(classify_word(chip_trailer(2)), TdcWordKind::ChipTrailer);
        assert_eq!(classify_word(global_trailer(3)), TdcWordKind::GlobalTrailer);
        assert_eq!(classify_word(error_word(1, 0x10)), TdcWordKind::ErrorFlag);
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(classify_word(0x3000_0000), TdcWordKind::Unknown);
        assert_eq!(classify_word(0x1000_0000), TdcWordKind::Unknown);
        // Extended trigger time tag is not decoded
        assert_eq!(classify_word(0x8800_0000), TdcWordKind::Unknown);
        assert_eq!(classify_word(0xFFFF_FFFF), TdcWordKind::Unknown);
    }

    #[test]
    fn test_classify_ignores_low_bits() {
        assert_eq!(classify_word(0x47FF_FFFF), TdcWordKind::GlobalHeader);
        assert_eq!(classify_word(0x07FF_FFFF), TdcWordKind::Measurement);
    }

    // -----------------------------------------------------------------------
    // load_slot tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_simple_event() {
        let mut m = module();
        let words = [global_header(5, 3), measurement(10, 0x1234), global_trailer(3)];
        let n = m.load_slot(&mut NullSink, &words).unwrap();

        assert_eq!(n, 3);
        assert_eq!(m.data(10, 0), 0x1234);
        assert_eq!(m.data(10, 1), 0);
        assert_eq!(m.num_hits(10), 1);
        assert_eq!(m.event_number(), 5);
        assert_eq!(m.slot_from_data(), Some(3));
        assert!(m.is_done());
        assert!(m.diagnostics().is_empty());
    }

    #[test]
    fn test_stops_at_trailer() {
        let mut m = module();
        let words = [
            global_header(1, 3),
            global_trailer(3),
            measurement(4, 99),
            global_header(2, 3),
        ];
        let n = m.load_slot(&mut NullSink, &words).unwrap();
        assert_eq!(n, 2);
        assert_eq!(m.num_hits(4), 0);
        assert_eq!(m.event_number(), 1);
    }

    #[test]
    fn test_no_trailer_consumes_everything() {
        let mut m = module();
        let words = [global_header(1, 3), measurement(0, 1), measurement(0, 2)];
        let n = m.load_slot(&mut NullSink, &words).unwrap();
        assert_eq!(n, 3);
        assert!(!m.is_done());
        assert_eq!(m.num_hits(0), 2);
    }

    #[test]
    fn test_empty_stream() {
        let mut m = module();
        m.clear();
        assert_eq!(m.load_slot(&mut NullSink, &[]).unwrap(), 0);
        assert_eq!(m.hits().total_hits(), 0);
    }

    #[test]
    fn test_fillers_ignored() {
        let mut m = module();
        let words = [
            0xC000_0000,
            global_header(7, 3),
            0xC000_0000,
            measurement(1, 42),
            global_trailer(3),
        ];
        assert_eq!(m.load_slot(&mut NullSink, &words).unwrap(), 5);
        assert_eq!(m.data(1, 0), 42);
        assert!(m.diagnostics().is_empty());
    }

    #[test]
    fn test_hits_kept_in_order() {
        let mut m = module();
        let mut words = vec![global_header(1, 3)];
        words.extend((0..5).map(|i| measurement(64, 1000 + i)));
        words.push(global_trailer(3));
        m.load_slot(&mut NullSink, &words).unwrap();
        for i in 0..5 {
            assert_eq!(m.data(64, i), 1000 + i as u32);
        }
        assert_eq!(m.data(64, 5), 0);
    }

    #[test]
    fn test_capacity_drops_silently() {
        let mut m = Tdc1190Module::new(
            ModuleAddress::new(1, 3),
            Tdc1190Config {
                max_hits: 4,
                log_diagnostics: false,
                ..Default::default()
            },
        );
        let mut words = vec![global_header(1, 3)];
        words.extend((0..10).map(|i| measurement(2, i + 1)));
        words.push(global_trailer(3));

        let mut sink = SlotData::new(100);
        let n = m.load_slot(&mut sink, &words).unwrap();
        assert_eq!(n, 12);
        assert_eq!(m.num_hits(2), 4);
        assert_eq!(m.hits().hits(2), &[1, 2, 3, 4]);
        assert_eq!(m.dropped_hits(), 6);
        // The sink still sees every measurement
        assert_eq!(sink.num_values(), 10);
    }

    #[test]
    fn test_out_of_range_channel_leaves_buffers_untouched() {
        let mut m = Tdc1190Module::new(
            ModuleAddress::new(1, 3),
            Tdc1190Config {
                channels: 16,
                log_diagnostics: false,
                ..Default::default()
            },
        );
        let words = [measurement(16, 5), measurement(127, 6), measurement(40, 7)];
        let before = m.hits().clone();
        m.load_slot(&mut NullSink, &words).unwrap();
        assert_eq!(m.hits().total_hits(), before.total_hits());
        for ch in 0..16 {
            assert_eq!(m.hits().hits(ch), before.hits(ch));
        }
        assert_eq!(m.out_of_range_hits(), 3);
    }

    #[test]
    fn test_unknown_word_reported_and_decode_continues() {
        let mut m = module();
        let words = [
            global_header(9, 3),
            measurement(1, 10),
            0x3000_0001,
            measurement(1, 11),
            global_trailer(3),
        ];
        let n = m.load_slot(&mut NullSink, &words).unwrap();
        assert_eq!(n, 5);
        assert!(m.is_done());
        assert_eq!(m.num_hits(1), 2);
        assert_eq!(
            m.diagnostics(),
            &[Diagnostic::UnknownWord {
                word: 0x3000_0001,
                event: 9
            }]
        );
    }

    #[test]
    fn test_error_word_reported() {
        let mut m = module();
        let words = [global_header(4, 3), error_word(2, 0x1ABC), global_trailer(3)];
        assert_eq!(m.load_slot(&mut NullSink, &words).unwrap(), 3);
        assert_eq!(
            m.diagnostics(),
            &[Diagnostic::TdcError {
                slot: 3,
                chip: 2,
                flags: 0x1ABC,
                event: 4
            }]
        );
    }

    #[test]
    fn test_error_word_before_header_uses_configured_slot() {
        let mut m = Tdc1190Module::new(
            ModuleAddress::new(1, 11),
            Tdc1190Config {
                log_diagnostics: false,
                ..Default::default()
            },
        );
        m.load_slot(&mut NullSink, &[error_word(0, 1)]).unwrap();
        assert!(matches!(
            m.diagnostics()[0],
            Diagnostic::TdcError { slot: 11, .. }
        ));
    }

    #[test]
    fn test_chip_mismatch_reported() {
        let mut m = module();
        let words = [
            global_header(1, 3),
            chip_header(0),
            measurement(0, 1),
            chip_trailer(0),
            chip_header(1),
            chip_trailer(2),
            global_trailer(3),
        ];
        m.load_slot(&mut NullSink, &words).unwrap();
        assert_eq!(
            m.diagnostics(),
            &[Diagnostic::ChipMismatch {
                header: 1,
                trailer: 2,
                event: 1
            }]
        );
    }

    #[test]
    fn test_trailer_checks() {
        let mut m = module();
        let trailer = global_trailer(4) | (0x5 << 24);
        m.load_slot(&mut NullSink, &[global_header(2, 3), trailer]).unwrap();
        assert_eq!(
            m.diagnostics(),
            &[
                Diagnostic::TrailerStatus { status: 5, event: 2 },
                Diagnostic::TrailerSlotMismatch {
                    header: 3,
                    trailer: 4,
                    event: 2
                },
            ]
        );
        assert!(m.is_done());
    }

    #[test]
    fn test_sink_rejection_aborts() {
        let mut m = module();
        let words = [
            global_header(5, 3),
            measurement(1, 100),
            measurement(2, 200),
            measurement(3, 300),
            global_trailer(3),
        ];
        let mut sink = RejectAfter { accept: 1, seen: 0 };
        let err = m.load_slot(&mut sink, &words).unwrap_err();

        match &err {
            DecodeError::SinkRejected { kind, channel, .. } => {
                assert_eq!(*kind, "tdc");
                assert_eq!(*channel, 2);
            }
        }
        assert_eq!(err.words_seen(), 3);
        assert_eq!(m.words_seen(), 3);
        assert_eq!(m.data(1, 0), 100);
        assert_eq!(m.num_hits(2), 0);
        assert_eq!(m.num_hits(3), 0);
        assert_eq!(m.hits().total_hits(), 1);
        assert!(!m.is_done());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut m = module();
        let words = [global_header(5, 3), measurement(10, 1), 0x3000_0000];
        m.load_slot(&mut NullSink, &words).unwrap();
        m.clear();
        assert_eq!(m.hits().total_hits(), 0);
        assert_eq!(m.data(10, 0), 0);
        assert_eq!(m.event_number(), 0);
        assert_eq!(m.slot_from_data(), None);
        assert!(m.diagnostics().is_empty());
    }

    #[test]
    fn test_consecutive_calls_append_without_clear() {
        let mut m = module();
        m.load_slot(&mut NullSink, &[measurement(0, 1), global_trailer(3)])
            .unwrap();
        m.load_slot(&mut NullSink, &[measurement(0, 2), global_trailer(3)])
            .unwrap();
        assert_eq!(m.hits().hits(0), &[1, 2]);
    }

    #[test]
    fn test_capabilities() {
        let m = module();
        assert!(!m.is_multi_function());
        assert!(m.has_capability(Capability::MultiHitTdc));
        assert!(!m.has_capability(Capability::PulseIntegral));
    }

    #[test]
    fn test_snapshot() {
        let mut m = module();
        let words = [global_header(5, 3), measurement(10, 7), global_trailer(3)];
        m.load_slot(&mut NullSink, &words).unwrap();
        let snap = m.snapshot();
        assert_eq!(snap.event_number, 5);
        assert_eq!(
            snap.channels,
            vec![ChannelHits {
                channel: 10,
                hits: vec![7]
            }]
        );
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"words_seen\":3"));
    }
}
