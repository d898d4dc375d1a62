//! Closed set of supported modules
//!
//! Every module kind implements [`ModuleDecoder`]; [`Module`] wraps the
//! concrete decoders so callers can hold them uniformly.

use serde::Serialize;

use super::common::{Capability, Diagnostic, ModuleAddress, RawWord};
use super::fadc250::{Fadc250Module, FadcSnapshot};
use super::tdc1190::{Tdc1190Module, TdcSnapshot};
use crate::common::DecodeResult;
use crate::slot_data::SlotSink;

/// Behaviour shared by all module decoders
pub trait ModuleDecoder {
    /// Human-readable module name
    fn name(&self) -> &'static str;

    fn address(&self) -> ModuleAddress;

    /// Reset decoded data and decode state
    fn clear(&mut self);

    /// Decode one contiguous range of words, returning the number examined
    fn load_slot(&mut self, sink: &mut dyn SlotSink, words: &[RawWord]) -> DecodeResult<usize>;

    fn words_seen(&self) -> usize;

    fn diagnostics(&self) -> &[Diagnostic];

    fn is_multi_function(&self) -> bool;

    fn has_capability(&self, capability: Capability) -> bool;

    fn snapshot(&self) -> ModuleSnapshot;
}

impl ModuleDecoder for Tdc1190Module {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn address(&self) -> ModuleAddress {
        Tdc1190Module::address(self)
    }

    fn clear(&mut self) {
        Tdc1190Module::clear(self)
    }

    fn load_slot(&mut self, sink: &mut dyn SlotSink, words: &[RawWord]) -> DecodeResult<usize> {
        Tdc1190Module::load_slot(self, sink, words)
    }

    fn words_seen(&self) -> usize {
        Tdc1190Module::words_seen(self)
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        Tdc1190Module::diagnostics(self)
    }

    fn is_multi_function(&self) -> bool {
        Tdc1190Module::is_multi_function(self)
    }

    fn has_capability(&self, capability: Capability) -> bool {
        Tdc1190Module::has_capability(self, capability)
    }

    fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot::Tdc1190(Tdc1190Module::snapshot(self))
    }
}

impl ModuleDecoder for Fadc250Module {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn address(&self) -> ModuleAddress {
        Fadc250Module::address(self)
    }

    fn clear(&mut self) {
        Fadc250Module::clear(self)
    }

    fn load_slot(&mut self, sink: &mut dyn SlotSink, words: &[RawWord]) -> DecodeResult<usize> {
        Fadc250Module::load_slot(self, sink, words)
    }

    fn words_seen(&self) -> usize {
        Fadc250Module::words_seen(self)
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        Fadc250Module::diagnostics(self)
    }

    fn is_multi_function(&self) -> bool {
        Fadc250Module::is_multi_function(self)
    }

    fn has_capability(&self, capability: Capability) -> bool {
        Fadc250Module::has_capability(self, capability)
    }

    fn snapshot(&self) -> ModuleSnapshot {
        ModuleSnapshot::Fadc250(Fadc250Module::snapshot(self))
    }
}

/// A decoder instance of one of the supported module kinds
#[derive(Debug, Clone)]
pub enum Module {
    Tdc1190(Tdc1190Module),
    Fadc250(Fadc250Module),
}

impl Module {
    fn inner(&self) -> &dyn ModuleDecoder {
        match self {
            Self::Tdc1190(m) => m,
            Self::Fadc250(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn ModuleDecoder {
        match self {
            Self::Tdc1190(m) => m,
            Self::Fadc250(m) => m,
        }
    }

    pub fn as_tdc1190(&self) -> Option<&Tdc1190Module> {
        match self {
            Self::Tdc1190(m) => Some(m),
            Self::Fadc250(_) => None,
        }
    }

    pub fn as_fadc250(&self) -> Option<&Fadc250Module> {
        match self {
            Self::Fadc250(m) => Some(m),
            Self::Tdc1190(_) => None,
        }
    }

    /// Registry type id of the wrapped module
    pub fn type_id(&self) -> u32 {
        match self {
            Self::Tdc1190(_) => super::tdc1190::TYPE_ID,
            Self::Fadc250(_) => super::fadc250::TYPE_ID,
        }
    }
}

impl ModuleDecoder for Module {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn address(&self) -> ModuleAddress {
        self.inner().address()
    }

    fn clear(&mut self) {
        self.inner_mut().clear()
    }

    fn load_slot(&mut self, sink: &mut dyn SlotSink, words: &[RawWord]) -> DecodeResult<usize> {
        self.inner_mut().load_slot(sink, words)
    }

    fn words_seen(&self) -> usize {
        self.inner().words_seen()
    }

    fn diagnostics(&self) -> &[Diagnostic] {
        self.inner().diagnostics()
    }

    fn is_multi_function(&self) -> bool {
        self.inner().is_multi_function()
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.inner().has_capability(capability)
    }

    fn snapshot(&self) -> ModuleSnapshot {
        self.inner().snapshot()
    }
}

/// Serializable decode result of any module kind
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum ModuleSnapshot {
    Tdc1190(TdcSnapshot),
    Fadc250(FadcSnapshot),
}

impl ModuleSnapshot {
    pub fn address(&self) -> ModuleAddress {
        match self {
            Self::Tdc1190(s) => s.address,
            Self::Fadc250(s) => s.address,
        }
    }
}
