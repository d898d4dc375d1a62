//! Common types for decoder module

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// One raw event-buffer word, unstructured until classified
pub type RawWord = u32;

/// Size of a raw word in bytes
pub const WORD_SIZE: usize = 4;

/// Physical location of a module in the VME system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleAddress {
    pub crate_id: u32,
    pub slot: u32,
}

impl ModuleAddress {
    pub fn new(crate_id: u32, slot: u32) -> Self {
        Self { crate_id, slot }
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "crate {} slot {}", self.crate_id, self.slot)
    }
}

/// Static measurement capabilities a module can advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Multi-hit time-to-digital conversion
    MultiHitTdc,
    /// Raw ADC samples
    SampleAdc,
    PulseIntegral,
    PulseTime,
    PulsePeak,
    PulsePedestal,
}

/// Observational record produced while decoding
///
/// Diagnostics never change the outcome of a decode call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Word matched no known pattern
    UnknownWord { word: u32, event: u32 },
    /// TDC error word from the output buffer
    TdcError {
        slot: u32,
        chip: u32,
        flags: u32,
        event: u32,
    },
    /// Chip number in chip trailer differs from the chip header
    ChipMismatch { header: u32, trailer: u32, event: u32 },
    /// Slot in global trailer differs from the global header
    TrailerSlotMismatch { header: u32, trailer: u32, event: u32 },
    /// Global trailer carries a non-zero error status
    TrailerStatus { status: u32, event: u32 },
    /// Event header slot differs from the block header slot
    SlotMismatch { block: u32, event_header: u32, event: u32 },
    /// Block trailer arrived before the announced scaler words
    ScalerTruncated { missing: u32, event: u32 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownWord { word, event } => {
                write!(f, "unknown word 0x{word:08x} (event {event})")
            }
            Self::TdcError {
                slot,
                chip,
                flags,
                event,
            } => write!(
                f,
                "TDC error: slot {slot}, chip {chip}, flags 0x{flags:x}, event {event}"
            ),
            Self::ChipMismatch {
                header,
                trailer,
                event,
            } => write!(
                f,
                "chip mismatch: header says {header}, trailer says {trailer} (event {event})"
            ),
            Self::TrailerSlotMismatch {
                header,
                trailer,
                event,
            } => write!(
                f,
                "slot mismatch between global header ({header}) and trailer ({trailer}) (event {event})"
            ),
            Self::TrailerStatus { status, event } => {
                write!(f, "error status 0x{status:x} in global trailer (event {event})")
            }
            Self::SlotMismatch {
                block,
                event_header,
                event,
            } => write!(
                f,
                "slot mismatch: block header {block}, event header {event_header} (event {event})"
            ),
            Self::ScalerTruncated { missing, event } => {
                write!(f, "scaler run cut short by block trailer, {missing} word(s) missing (event {event})")
            }
        }
    }
}

/// Diagnostics collected by one module instance
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
    log_enabled: bool,
}

impl DiagnosticLog {
    pub fn new(log_enabled: bool) -> Self {
        Self {
            entries: Vec::new(),
            log_enabled,
        }
    }

    /// Record a diagnostic and emit it through tracing
    pub fn report(&mut self, module: &str, address: ModuleAddress, diagnostic: Diagnostic) {
        if self.log_enabled {
            emit(module, address, &diagnostic);
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn emit(module: &str, address: ModuleAddress, diagnostic: &Diagnostic) {
    let crate_id = address.crate_id;
    let slot = address.slot;
    match *diagnostic {
        Diagnostic::UnknownWord { word, event } => {
            warn!(module, crate_id, slot, word, event, "Unknown word");
        }
        Diagnostic::TdcError {
            slot: data_slot,
            chip,
            flags,
            event,
        } => {
            warn!(module, crate_id, slot, data_slot, chip, flags, event, "TDC error word");
        }
        Diagnostic::ChipMismatch {
            header,
            trailer,
            event,
        } => {
            warn!(module, crate_id, slot, header, trailer, event, "Chip header/trailer mismatch");
        }
        Diagnostic::TrailerSlotMismatch {
            header,
            trailer,
            event,
        } => {
            warn!(module, crate_id, slot, header, trailer, event, "Global header/trailer slot mismatch");
        }
        Diagnostic::TrailerStatus { status, event } => {
            warn!(module, crate_id, slot, status, event, "Error status in global trailer");
        }
        Diagnostic::SlotMismatch {
            block,
            event_header,
            event,
        } => {
            warn!(module, crate_id, slot, block, event_header, event, "Block/event header slot mismatch");
        }
        Diagnostic::ScalerTruncated { missing, event } => {
            warn!(module, crate_id, slot, missing, event, "Scaler run cut short by block trailer");
        }
    }
}

/// Convert a little-endian byte buffer into raw words
///
/// Trailing bytes that do not fill a whole word are ignored.
pub fn words_from_le_bytes(data: &[u8]) -> Vec<RawWord> {
    data.chunks_exact(WORD_SIZE)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Convert raw words into a little-endian byte buffer
pub fn words_to_le_bytes(words: &[RawWord]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
