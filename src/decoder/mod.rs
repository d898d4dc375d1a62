//! Decoders for VME front-end module raw data
//!
//! Converts 32-bit event-buffer words into per-channel measurements held by
//! each module instance.

pub mod classify;
pub mod common;
pub mod fadc250;
pub mod hit_buffer;
pub mod module;
pub mod pulse;
pub mod registry;
pub mod stream;
pub mod tdc1190;

pub use common::{Capability, Diagnostic, ModuleAddress, RawWord};
pub use fadc250::{Fadc250Config, Fadc250Module, FadcMode, FadcWordKind};
pub use module::{Module, ModuleDecoder, ModuleSnapshot};
pub use registry::{ModuleRegistry, RegistryError};
pub use stream::{decode_stream, StreamSummary};
pub use tdc1190::{Tdc1190Config, Tdc1190Module, TdcWordKind};
