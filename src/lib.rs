//! vme-decode: raw data decoders for VME front-end modules
//!
//! Turns the 32-bit event-buffer words of a CAEN V1190 multi-hit TDC or a
//! JLab FADC250 flash ADC into per-channel measurements.

pub mod common;
pub mod config;
pub mod decoder;
pub mod emulator;
pub mod slot_data;
