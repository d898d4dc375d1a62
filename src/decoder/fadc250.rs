//! JLab FADC250 flash ADC decoder
//!
//! Decodes the 32-bit block-structured output of the FADC250.
//!
//! # Data Format
//!
//! Block Header → (Event Header → Trigger Time → channel data*)* → Block Trailer
//!
//! - A word with bit 31 set defines a data type in bits 30..27
//! - A word with bit 31 clear continues the last defining word
//! - Window raw data and pulse raw data continuations carry two samples each
//! - Scaler headers are followed by a counted number of scaler words
//!
//! Time words combine coarse (4 ns) and fine (4 ns / 64) time into a single
//! value in units of 62.5 ps.

use serde::Serialize;
use tracing::{debug, warn};

use super::classify::{classify, WordRule};
use super::common::{Capability, Diagnostic, DiagnosticLog, ModuleAddress, RawWord};
use super::pulse::{PulseBuffer, PulseRecord};
use crate::common::{DecodeError, DecodeResult};
use crate::slot_data::SlotSink;

/// Registry type id of the FADC250
pub const TYPE_ID: u32 = 250;
/// Number of ADC channels
pub const FADC_CHANNELS: usize = 16;
/// Length of one fine time unit in nanoseconds
pub const TIME_UNIT_NS: f64 = 4.0 / 64.0;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

mod constants {
    pub const DEFINING_BIT: u32 = 0x8000_0000;
    pub const TYPE_MASK: u32 = 0xF800_0000;
    pub const TYPE_SHIFT: u32 = 27;

    pub const fn type_pattern(data_type: u32) -> u32 {
        DEFINING_BIT | (data_type << TYPE_SHIFT)
    }

    pub const SLOT_SHIFT: u32 = 22;
    pub const SLOT_MASK: u32 = 0x1F;

    pub mod block_header {
        pub const MODULE_ID_SHIFT: u32 = 18;
        pub const MODULE_ID_MASK: u32 = 0xF;
        pub const BLOCK_NUMBER_SHIFT: u32 = 8;
        pub const BLOCK_NUMBER_MASK: u32 = 0x3FF;
        pub const EVENTS_MASK: u32 = 0xFF;

        // Continuation word
        pub const PL_SHIFT: u32 = 18;
        pub const PL_MASK: u32 = 0x7FF;
        pub const NSB_SHIFT: u32 = 9;
        pub const NSB_MASK: u32 = 0x1FF;
        pub const NSA_MASK: u32 = 0x1FF;
    }

    pub mod block_trailer {
        pub const WORDS_MASK: u32 = 0x3F_FFFF;
    }

    pub mod event_header {
        pub const EVENT_MASK: u32 = 0x3F_FFFF;
    }

    pub mod trigger_time {
        pub const TIME_MASK: u32 = 0xFF_FFFF;
        pub const HIGH_SHIFT: u32 = 24;
    }

    pub mod channel_data {
        pub const CHANNEL_SHIFT: u32 = 23;
        pub const CHANNEL_MASK: u32 = 0xF;
        pub const PULSE_SHIFT: u32 = 21;
        pub const PULSE_MASK: u32 = 0x3;
        pub const QUALITY_SHIFT: u32 = 19;
        pub const QUALITY_MASK: u32 = 0x3;
    }

    pub mod window {
        pub const WIDTH_MASK: u32 = 0xFFF;
    }

    pub mod samples {
        pub const FIRST_SHIFT: u32 = 16;
        pub const SAMPLE_MASK: u32 = 0x1FFF;
        pub const OVERFLOW_BIT: u32 = 12;
        pub const INVALID_BIT: u32 = 13;
    }

    pub mod pulse_raw {
        pub const THRESHOLD_SAMPLE_MASK: u32 = 0x3FF;
    }

    pub mod integral {
        pub const INTEGRAL_MASK: u32 = 0x7_FFFF;
    }

    pub mod time {
        pub const COARSE_SHIFT: u32 = 6;
        pub const COARSE_MASK: u32 = 0x3FF;
        pub const FINE_MASK: u32 = 0x3F;
    }

    pub mod pedestal {
        pub const PEDESTAL_SHIFT: u32 = 12;
        pub const PEDESTAL_MASK: u32 = 0x1FF;
        pub const PEAK_MASK: u32 = 0xFFF;
    }

    pub mod event_block {
        pub const EVENT_OF_BLOCK_SHIFT: u32 = 19;
        pub const EVENT_OF_BLOCK_MASK: u32 = 0xFF;
    }

    pub mod scaler {
        pub const COUNT_MASK: u32 = 0x3F;
    }
}

/// Kind of an FADC250 word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FadcWordKind {
    BlockHeader,
    BlockTrailer,
    EventHeader,
    TriggerTime,
    WindowRawData,
    PulseRawData,
    PulseIntegral,
    PulseTime,
    PulsePedestal,
    Scaler,
    EventBlockInfo,
    /// Bit 31 clear: belongs to the last defining word
    Continuation,
    DataNotValid,
    Filler,
    Unknown,
}

const RULES: [WordRule<FadcWordKind>; 15] = [
    WordRule::new(constants::DEFINING_BIT, 0, FadcWordKind::Continuation),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(0),
        FadcWordKind::BlockHeader,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(1),
        FadcWordKind::BlockTrailer,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(2),
        FadcWordKind::EventHeader,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(3),
        FadcWordKind::TriggerTime,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(4),
        FadcWordKind::WindowRawData,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(6),
        FadcWordKind::PulseRawData,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(7),
        FadcWordKind::PulseIntegral,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(8),
        FadcWordKind::PulseTime,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(9),
        FadcWordKind::EventBlockInfo,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(10),
        FadcWordKind::PulsePedestal,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(12),
        FadcWordKind::Scaler,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(14),
        FadcWordKind::DataNotValid,
    ),
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(15),
        FadcWordKind::Filler,
    ),
    // Event trailer (type 13) is not produced in block mode
    WordRule::new(
        constants::TYPE_MASK,
        constants::type_pattern(13),
        FadcWordKind::Unknown,
    ),
];

/// Classify an FADC250 word without decode context
pub fn classify_word(word: RawWord) -> FadcWordKind {
    classify(word, &RULES, FadcWordKind::Unknown)
}

/// Readout mode inferred from the data types present in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FadcMode {
    WindowRaw,
    PulseRaw,
    PulseIntegral,
    PulseTime,
    IntegralTime,
    IntegralTimePedestal,
    PulseParameters,
    PulseParametersWithRaw,
    Unknown,
}

impl FadcMode {
    /// Mode number as configured on the hardware, -1 when unknown
    pub fn number(&self) -> i32 {
        match self {
            Self::WindowRaw => 1,
            Self::PulseRaw => 2,
            Self::PulseIntegral => 3,
            Self::PulseTime => 4,
            Self::IntegralTime => 7,
            Self::IntegralTimePedestal => 8,
            Self::PulseParameters => 9,
            Self::PulseParametersWithRaw => 10,
            Self::Unknown => -1,
        }
    }
}

/// Data types seen since the last clear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataTypesSeen {
    pub window_raw: bool,
    pub pulse_raw: bool,
    pub pulse_integral: bool,
    pub pulse_time: bool,
    pub pulse_parameters: bool,
    pub pulse_pedestal: bool,
}

impl DataTypesSeen {
    fn mode(&self) -> FadcMode {
        let t = (
            self.window_raw,
            self.pulse_raw,
            self.pulse_integral,
            self.pulse_time,
            self.pulse_parameters,
            self.pulse_pedestal,
        );
        match t {
            (true, false, false, false, false, false) => FadcMode::WindowRaw,
            (false, true, false, false, false, false) => FadcMode::PulseRaw,
            (false, false, true, false, false, false) => FadcMode::PulseIntegral,
            (false, false, false, true, false, false) => FadcMode::PulseTime,
            (false, false, true, true, false, false) => FadcMode::IntegralTime,
            (false, false, true, true, false, true) => FadcMode::IntegralTimePedestal,
            (false, false, false, false, true, false) => FadcMode::PulseParameters,
            (true, false, false, false, true, false) => FadcMode::PulseParametersWithRaw,
            _ => FadcMode::Unknown,
        }
    }
}

/// Block and event header fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BlockInfo {
    pub block_header_slot: u32,
    pub module_id: u32,
    pub block_number: u32,
    pub block_events: u32,
    /// Trigger window latency
    pub pl: u32,
    /// Samples after threshold crossing
    pub nsa: u32,
    /// Samples before threshold crossing
    pub nsb: u32,
    pub block_trailer_slot: u32,
    pub words_in_block: u32,
    pub event_header_slot: u32,
    pub event_number: u32,
    pub trigger_time: u64,
    pub event_of_block: u32,
}

/// Block/event framing consistency after a decode pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStatus {
    pub block_header_found: bool,
    pub block_trailer_found: bool,
    pub event_header_found: bool,
    pub slots_match: bool,
}

impl DecoderStatus {
    pub fn is_ok(&self) -> bool {
        self.block_header_found
            && self.block_trailer_found
            && self.event_header_found
            && self.slots_match
    }
}

/// Value waiting to be forwarded to the slot sink
#[derive(Debug, Clone, Copy)]
struct Observation {
    kind: &'static str,
    channel: u32,
    value: u32,
}

// ---------------------------------------------------------------------------
// FADC250 Configuration & Decoder
// ---------------------------------------------------------------------------

/// FADC250 decoder configuration
#[derive(Debug, Clone)]
pub struct Fadc250Config {
    /// Number of channels with pulse storage
    pub channels: usize,
    /// Emit diagnostics through tracing
    pub log_diagnostics: bool,
}

impl Default for Fadc250Config {
    fn default() -> Self {
        Self {
            channels: FADC_CHANNELS,
            log_diagnostics: true,
        }
    }
}

/// Decoder state and pulse storage for one FADC250 module
#[derive(Debug, Clone)]
pub struct Fadc250Module {
    address: ModuleAddress,
    pulses: PulseBuffer,
    diagnostics: DiagnosticLog,
    info: BlockInfo,
    status: DecoderStatus,
    types_seen: DataTypesSeen,
    /// Last defining word kind, gives meaning to continuation words
    last_defining: Option<FadcWordKind>,
    channel: u32,
    window_remaining: u32,
    scaler_remaining: u32,
    scalers: Vec<u32>,
    event_block_words: u32,
    overflow: bool,
    invalid_samples: bool,
    pedestal_sum: u64,
    words_seen: usize,
    outbox: Vec<Observation>,
}

impl Fadc250Module {
    pub const NAME: &'static str = "JLab FADC 250 Module";

    pub fn new(address: ModuleAddress, config: Fadc250Config) -> Self {
        Self {
            address,
            pulses: PulseBuffer::new(config.channels),
            diagnostics: DiagnosticLog::new(config.log_diagnostics),
            info: BlockInfo::default(),
            status: DecoderStatus::default(),
            types_seen: DataTypesSeen::default(),
            last_defining: None,
            channel: 0,
            window_remaining: 0,
            scaler_remaining: 0,
            scalers: Vec::new(),
            event_block_words: 0,
            overflow: false,
            invalid_samples: false,
            pedestal_sum: 0,
            words_seen: 0,
            outbox: Vec::new(),
        }
    }

    /// Create a module with the default channel count
    pub fn with_defaults(address: ModuleAddress) -> Self {
        Self::new(address, Fadc250Config::default())
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Reset pulse storage and all decode state
    pub fn clear(&mut self) {
        self.pulses.clear();
        self.diagnostics.clear();
        self.info = BlockInfo::default();
        self.status = DecoderStatus::default();
        self.types_seen = DataTypesSeen::default();
        self.last_defining = None;
        self.channel = 0;
        self.window_remaining = 0;
        self.scaler_remaining = 0;
        self.scalers.clear();
        self.event_block_words = 0;
        self.overflow = false;
        self.invalid_samples = false;
        self.pedestal_sum = 0;
        self.words_seen = 0;
        self.outbox.clear();
    }

    /// Decode a block
    ///
    /// Consumes words until the block trailer (inclusive) or the end of
    /// `words`. Returns the number of words examined.
    pub fn load_slot(&mut self, sink: &mut dyn SlotSink, words: &[RawWord]) -> DecodeResult<usize> {
        self.load_range(sink, words, true)
    }

    /// Decode `len` words of `buffer` starting at `pos`
    ///
    /// The caller drives block iteration, so block trailers do not stop the
    /// call. The range is clamped to the buffer. With `len == 1` exactly one
    /// word is decoded.
    pub fn load_slot_at(
        &mut self,
        sink: &mut dyn SlotSink,
        buffer: &[RawWord],
        pos: usize,
        len: usize,
    ) -> DecodeResult<usize> {
        let start = pos.min(buffer.len());
        let end = pos.saturating_add(len).min(buffer.len());
        self.load_range(sink, &buffer[start..end], false)
    }

    /// Classify and act on one word without forwarding values to a sink
    pub fn decode_word(&mut self, word: RawWord) -> FadcWordKind {
        let kind = self.step(word);
        self.outbox.clear();
        kind
    }

    /// Check block/event framing of the data decoded so far
    ///
    /// A failed check is logged but never aborts analysis.
    pub fn check_decoder_status(&self) -> DecoderStatus {
        let status = self.status;
        if !status.is_ok() {
            warn!(
                crate_id = self.address.crate_id,
                slot = self.address.slot,
                block_header_found = status.block_header_found,
                block_trailer_found = status.block_trailer_found,
                event_header_found = status.event_header_found,
                slots_match = status.slots_match,
                "FADC250 decoder status check failed"
            );
        }
        status
    }

    pub fn fadc_mode(&self) -> FadcMode {
        self.types_seen.mode()
    }

    pub fn is_multi_function(&self) -> bool {
        true
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        matches!(
            capability,
            Capability::SampleAdc
                | Capability::PulseIntegral
                | Capability::PulseTime
                | Capability::PulsePeak
                | Capability::PulsePedestal
        )
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn address(&self) -> ModuleAddress {
        self.address
    }

    pub fn pulses(&self) -> &PulseBuffer {
        &self.pulses
    }

    pub fn pulse(&self, channel: usize, index: usize) -> Option<&PulseRecord> {
        self.pulses.pulse(channel, index)
    }

    pub fn num_pulses(&self, channel: usize) -> usize {
        self.pulses.num_pulses(channel)
    }

    pub fn pulse_integral(&self, channel: usize, index: usize) -> u32 {
        self.field(channel, index, |p| p.integral)
    }

    pub fn pulse_time(&self, channel: usize, index: usize) -> u32 {
        self.field(channel, index, |p| p.time)
    }

    /// Pulse time converted to nanoseconds
    pub fn pulse_time_ns(&self, channel: usize, index: usize) -> f64 {
        f64::from(self.pulse_time(channel, index)) * TIME_UNIT_NS
    }

    pub fn pulse_coarse_time(&self, channel: usize, index: usize) -> u32 {
        self.field(channel, index, |p| p.coarse_time)
    }

    pub fn pulse_fine_time(&self, channel: usize, index: usize) -> u32 {
        self.field(channel, index, |p| p.fine_time)
    }

    pub fn pulse_peak(&self, channel: usize, index: usize) -> u32 {
        self.field(channel, index, |p| p.peak)
    }

    pub fn pulse_pedestal(&self, channel: usize, index: usize) -> u32 {
        self.field(channel, index, |p| p.pedestal)
    }

    /// Raw samples of a channel in arrival order
    pub fn pulse_samples(&self, channel: usize) -> &[u32] {
        self.pulses.samples(channel)
    }

    /// One raw sample, or 0 when it does not exist
    pub fn pulse_sample(&self, channel: usize, index: usize) -> u32 {
        self.pulses.sample(channel, index)
    }

    pub fn num_samples(&self, channel: usize) -> usize {
        self.pulses.num_samples(channel)
    }

    /// Integral computed as the sum of the channel's raw samples
    pub fn emulated_pulse_integral(&self, channel: usize) -> u64 {
        self.pulses.emulated_integral(channel)
    }

    /// Hardware integral of the latest pulse, or the emulated integral when
    /// the hardware supplied none
    pub fn pulse_integral_or_emulated(&self, channel: usize) -> u64 {
        self.pulses
            .pulses(channel)
            .last()
            .and_then(|p| p.integral)
            .map_or_else(|| self.emulated_pulse_integral(channel), u64::from)
    }

    pub fn block_info(&self) -> &BlockInfo {
        &self.info
    }

    pub fn event_number(&self) -> u32 {
        self.info.event_number
    }

    pub fn trigger_time(&self) -> u64 {
        self.info.trigger_time
    }

    /// Any sample carried the overflow bit
    pub fn overflow(&self) -> bool {
        self.overflow
    }

    /// Any sample inside a raw window was flagged not valid
    pub fn invalid_samples(&self) -> bool {
        self.invalid_samples
    }

    /// Sum of all pedestal values decoded since the last clear
    pub fn pedestal_sum(&self) -> u64 {
        self.pedestal_sum
    }

    pub fn scalers(&self) -> &[u32] {
        &self.scalers
    }

    pub fn scaler_sum(&self) -> u64 {
        self.scalers.iter().map(|&s| u64::from(s)).sum()
    }

    pub fn words_seen(&self) -> usize {
        self.words_seen
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.entries()
    }

    pub fn snapshot(&self) -> FadcSnapshot {
        let channels = (0..self.pulses.n_channels())
            .filter(|&ch| self.num_pulses(ch) > 0 || self.num_samples(ch) > 0)
            .map(|ch| FadcChannelSnapshot {
                channel: ch,
                pulses: self.pulses.pulses(ch).to_vec(),
                samples: self.pulse_samples(ch).to_vec(),
                emulated_integral: self.emulated_pulse_integral(ch),
            })
            .collect();

        FadcSnapshot {
            address: self.address,
            mode: self.fadc_mode(),
            info: self.info,
            status: self.status,
            words_seen: self.words_seen,
            overflow: self.overflow,
            invalid_samples: self.invalid_samples,
            channels,
            diagnostics: self.diagnostics.entries().to_vec(),
        }
    }

    // -----------------------------------------------------------------------
    // Word handling
    // -----------------------------------------------------------------------

    fn load_range(
        &mut self,
        sink: &mut dyn SlotSink,
        words: &[RawWord],
        stop_at_trailer: bool,
    ) -> DecodeResult<usize> {
        self.words_seen = 0;
        self.outbox.clear();

        for &word in words {
            self.words_seen += 1;
            let kind = self.step(word);
            self.flush(sink)?;
            if stop_at_trailer && kind == FadcWordKind::BlockTrailer {
                break;
            }
        }
        if stop_at_trailer {
            self.pulses.commit();
        }

        debug!(
            slot = self.address.slot,
            words = self.words_seen,
            pulses = self.pulses.total_pulses(),
            samples = self.pulses.total_samples(),
            "FADC250 load_slot finished"
        );

        Ok(self.words_seen)
    }

    fn flush(&mut self, sink: &mut dyn SlotSink) -> DecodeResult<()> {
        for obs in self.outbox.drain(..) {
            sink.submit(obs.kind, obs.channel, obs.value, obs.value)
                .map_err(|source| DecodeError::SinkRejected {
                    kind: obs.kind,
                    channel: obs.channel,
                    words_seen: self.words_seen,
                    source,
                })?;
        }
        Ok(())
    }

    fn step(&mut self, word: RawWord) -> FadcWordKind {
        let kind = classify_word(word);

        // Scaler values are plain counts and may have bit 31 set; only a block
        // trailer ends the run early
        if self.scaler_remaining > 0 {
            if kind != FadcWordKind::BlockTrailer {
                self.scaler_remaining -= 1;
                self.scalers.push(word);
                return FadcWordKind::Continuation;
            }
            let diagnostic = Diagnostic::ScalerTruncated {
                missing: self.scaler_remaining,
                event: self.info.event_number,
            };
            self.scaler_remaining = 0;
            self.report(diagnostic);
        }

        match kind {
            FadcWordKind::Continuation => self.decode_continuation(word),
            FadcWordKind::BlockHeader => self.decode_block_header(word),
            FadcWordKind::BlockTrailer => self.decode_block_trailer(word),
            FadcWordKind::EventHeader => self.decode_event_header(word),
            FadcWordKind::TriggerTime => {
                self.info.trigger_time = u64::from(word & constants::trigger_time::TIME_MASK);
            }
            FadcWordKind::WindowRawData => {
                self.types_seen.window_raw = true;
                self.channel = channel_of(word);
                self.window_remaining = word & constants::window::WIDTH_MASK;
            }
            FadcWordKind::PulseRawData => {
                self.types_seen.pulse_raw = true;
                self.channel = channel_of(word);
                if let Some(p) = self.pulses.open(self.channel as usize, pulse_of(word)) {
                    p.threshold_sample = Some(word & constants::pulse_raw::THRESHOLD_SAMPLE_MASK);
                }
            }
            FadcWordKind::PulseIntegral => self.decode_pulse_integral(word),
            FadcWordKind::PulseTime => self.decode_pulse_time(word),
            FadcWordKind::PulsePedestal => self.decode_pulse_pedestal(word),
            FadcWordKind::EventBlockInfo => {
                self.types_seen.pulse_parameters = true;
                self.info.event_of_block = (word >> constants::event_block::EVENT_OF_BLOCK_SHIFT)
                    & constants::event_block::EVENT_OF_BLOCK_MASK;
            }
            FadcWordKind::Scaler => {
                self.scaler_remaining = word & constants::scaler::COUNT_MASK;
            }
            FadcWordKind::DataNotValid | FadcWordKind::Filler => {}
            FadcWordKind::Unknown => {
                let diagnostic = Diagnostic::UnknownWord {
                    word,
                    event: self.info.event_number,
                };
                self.report(diagnostic);
            }
        }

        if kind != FadcWordKind::Continuation {
            self.last_defining = Some(kind);
        }
        kind
    }

    fn decode_continuation(&mut self, word: RawWord) {
        match self.last_defining {
            Some(FadcWordKind::BlockHeader) => {
                self.info.pl = (word >> constants::block_header::PL_SHIFT)
                    & constants::block_header::PL_MASK;
                self.info.nsb = (word >> constants::block_header::NSB_SHIFT)
                    & constants::block_header::NSB_MASK;
                self.info.nsa = word & constants::block_header::NSA_MASK;
            }
            Some(FadcWordKind::TriggerTime) => {
                let high = u64::from(word & constants::trigger_time::TIME_MASK);
                self.info.trigger_time |= high << constants::trigger_time::HIGH_SHIFT;
            }
            Some(FadcWordKind::WindowRawData) => {
                for half in sample_halves(word) {
                    self.window_sample(half);
                }
            }
            Some(FadcWordKind::PulseRawData) => {
                for half in sample_halves(word) {
                    self.pulse_raw_sample(half);
                }
            }
            Some(FadcWordKind::EventBlockInfo) => {
                self.event_block_words += 1;
            }
            Some(_) => {
                debug!(word, "FADC250 continuation ignored");
            }
            None => {
                let diagnostic = Diagnostic::UnknownWord {
                    word,
                    event: self.info.event_number,
                };
                self.report(diagnostic);
            }
        }
    }

    fn decode_block_header(&mut self, word: RawWord) {
        self.info.block_header_slot = slot_of(word);
        self.info.module_id = (word >> constants::block_header::MODULE_ID_SHIFT)
            & constants::block_header::MODULE_ID_MASK;
        self.info.block_number = (word >> constants::block_header::BLOCK_NUMBER_SHIFT)
            & constants::block_header::BLOCK_NUMBER_MASK;
        self.info.block_events = word & constants::block_header::EVENTS_MASK;
        self.status.block_header_found = true;
        self.status.block_trailer_found = false;
    }

    fn decode_block_trailer(&mut self, word: RawWord) {
        self.info.block_trailer_slot = slot_of(word);
        self.info.words_in_block = word & constants::block_trailer::WORDS_MASK;
        self.status.block_trailer_found = true;
        self.pulses.commit();
    }

    fn decode_event_header(&mut self, word: RawWord) {
        self.pulses.commit();
        let slot = slot_of(word);
        self.info.event_header_slot = slot;
        self.info.event_number = word & constants::event_header::EVENT_MASK;
        self.status.event_header_found = true;

        let expected = if self.status.block_header_found {
            self.info.block_header_slot
        } else {
            self.address.slot
        };
        self.status.slots_match = slot == expected;
        if !self.status.slots_match {
            let diagnostic = Diagnostic::SlotMismatch {
                block: expected,
                event_header: slot,
                event: self.info.event_number,
            };
            self.report(diagnostic);
        }
    }

    fn decode_pulse_integral(&mut self, word: RawWord) {
        self.types_seen.pulse_integral = true;
        let channel = channel_of(word);
        let integral = word & constants::integral::INTEGRAL_MASK;
        let quality = quality_of(word);
        if let Some(p) = self
            .pulses
            .attach(channel as usize, pulse_of(word), |p| p.integral.is_some())
        {
            p.integral = Some(integral);
            p.quality_factor = Some(quality);
            self.outbox.push(Observation {
                kind: "adc",
                channel,
                value: integral,
            });
        }
    }

    fn decode_pulse_time(&mut self, word: RawWord) {
        self.types_seen.pulse_time = true;
        let channel = channel_of(word);
        let coarse = (word >> constants::time::COARSE_SHIFT) & constants::time::COARSE_MASK;
        let fine = word & constants::time::FINE_MASK;
        let quality = quality_of(word);
        if let Some(p) = self
            .pulses
            .attach(channel as usize, pulse_of(word), |p| p.time.is_some())
        {
            p.coarse_time = Some(coarse);
            p.fine_time = Some(fine);
            p.time = Some((coarse << constants::time::COARSE_SHIFT) | fine);
            p.quality_factor.get_or_insert(quality);
        }
    }

    fn decode_pulse_pedestal(&mut self, word: RawWord) {
        self.types_seen.pulse_pedestal = true;
        let channel = channel_of(word);
        let pedestal = (word >> constants::pedestal::PEDESTAL_SHIFT)
            & constants::pedestal::PEDESTAL_MASK;
        let peak = word & constants::pedestal::PEAK_MASK;
        if let Some(p) = self
            .pulses
            .attach(channel as usize, pulse_of(word), |p| p.pedestal.is_some())
        {
            p.pedestal = Some(pedestal);
            p.peak = Some(peak);
            self.pedestal_sum += u64::from(pedestal);
        }
    }

    fn window_sample(&mut self, half: SampleHalf) {
        if self.window_remaining == 0 {
            // Padding after an odd window width
            return;
        }
        self.window_remaining -= 1;
        if half.overflow {
            self.overflow = true;
        }
        if half.invalid {
            self.invalid_samples = true;
            return;
        }
        if self.pulses.push_sample(self.channel as usize, half.value) {
            self.outbox.push(Observation {
                kind: "sample",
                channel: self.channel,
                value: half.value,
            });
        }
    }

    fn pulse_raw_sample(&mut self, half: SampleHalf) {
        if half.invalid {
            return;
        }
        if half.overflow {
            self.overflow = true;
        }
        let channel = self.channel as usize;
        if let Some(p) = self.pulses.latest_mut(channel) {
            p.samples.push(half.value);
        }
        if self.pulses.push_sample(channel, half.value) {
            self.outbox.push(Observation {
                kind: "sample",
                channel: self.channel,
                value: half.value,
            });
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.report("FADC250", self.address, diagnostic);
    }

    fn field(&self, channel: usize, index: usize, get: impl Fn(&PulseRecord) -> Option<u32>) -> u32 {
        self.pulses
            .pulse(channel, index)
            .and_then(get)
            .unwrap_or(0)
    }
}

/// Pulses and samples of one channel in a [`FadcSnapshot`]
#[derive(Debug, Clone, Serialize)]
pub struct FadcChannelSnapshot {
    pub channel: usize,
    pub pulses: Vec<PulseRecord>,
    pub samples: Vec<u32>,
    pub emulated_integral: u64,
}

/// Serializable view of a decoded FADC250 block
#[derive(Debug, Clone, Serialize)]
pub struct FadcSnapshot {
    pub address: ModuleAddress,
    pub mode: FadcMode,
    pub info: BlockInfo,
    pub status: DecoderStatus,
    pub words_seen: usize,
    pub overflow: bool,
    pub invalid_samples: bool,
    pub channels: Vec<FadcChannelSnapshot>,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Free functions (pure, easy to test)
// ---------------------------------------------------------------------------

/// One of the two samples packed in a raw data continuation word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SampleHalf {
    value: u32,
    overflow: bool,
    invalid: bool,
}

impl SampleHalf {
    fn from_bits(bits: u32) -> Self {
        Self {
            value: bits & constants::samples::SAMPLE_MASK,
            overflow: (bits >> constants::samples::OVERFLOW_BIT) & 1 != 0,
            invalid: (bits >> constants::samples::INVALID_BIT) & 1 != 0,
        }
    }
}

/// Split a continuation word into its first (high) and second (low) sample
fn sample_halves(word: RawWord) -> [SampleHalf; 2] {
    [
        SampleHalf::from_bits(word >> constants::samples::FIRST_SHIFT),
        SampleHalf::from_bits(word),
    ]
}

#[inline]
fn slot_of(word: RawWord) -> u32 {
    (word >> constants::SLOT_SHIFT) & constants::SLOT_MASK
}

#[inline]
fn channel_of(word: RawWord) -> u32 {
    (word >> constants::channel_data::CHANNEL_SHIFT) & constants::channel_data::CHANNEL_MASK
}

#[inline]
fn pulse_of(word: RawWord) -> u32 {
    (word >> constants::channel_data::PULSE_SHIFT) & constants::channel_data::PULSE_MASK
}

#[inline]
fn quality_of(word: RawWord) -> u32 {
    (word >> constants::channel_data::QUALITY_SHIFT) & constants::channel_data::QUALITY_MASK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
