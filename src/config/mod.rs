//! Configuration module for the VME decoder
//!
//! Loaded from a TOML file:
//! - `[decoder]` buffer capacities and logging
//! - `[[modules]]` one entry per module to decode
//!
//! # Example
//! ```ignore
//! let config = Config::load("config.toml")?;
//! let tdc = config.module("tdc-left").unwrap();
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::decoder::common::ModuleAddress;
use crate::decoder::fadc250::{Fadc250Config, FADC_CHANNELS};
use crate::decoder::tdc1190::{Tdc1190Config, TDC_CHANNELS, TDC_MAX_HITS};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Duplicate module name: {0}")]
    DuplicateName(String),

    #[error("Two modules configured at {0}")]
    DuplicateAddress(ModuleAddress),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub decoder: DecoderSettings,
    #[serde(default)]
    pub modules: Vec<ModuleConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get module configuration by name
    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Module names and addresses must be unique
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        let mut addresses = HashSet::new();
        for module in &self.modules {
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::DuplicateName(module.name.clone()));
            }
            if !addresses.insert(module.address()) {
                return Err(ConfigError::DuplicateAddress(module.address()));
            }
        }
        Ok(())
    }
}

// =============================================================================
// Decoder Settings
// =============================================================================

/// Buffer capacities shared by every module of a kind
#[derive(Debug, Clone, Deserialize)]
pub struct DecoderSettings {
    /// TDC channels per module
    #[serde(default = "default_tdc_channels")]
    pub tdc_channels: usize,

    /// Hits stored per TDC channel before further hits are dropped
    #[serde(default = "default_tdc_max_hits")]
    pub tdc_max_hits: usize,

    /// FADC channels per module
    #[serde(default = "default_fadc_channels")]
    pub fadc_channels: usize,

    /// Values a slot data sink accepts before rejecting
    #[serde(default = "default_sink_max_values")]
    pub sink_max_values: usize,

    /// Emit decode diagnostics as log records
    #[serde(default = "default_log_diagnostics")]
    pub log_diagnostics: bool,
}

impl Default for DecoderSettings {
    fn default() -> Self {
        Self {
            tdc_channels: default_tdc_channels(),
            tdc_max_hits: default_tdc_max_hits(),
            fadc_channels: default_fadc_channels(),
            sink_max_values: default_sink_max_values(),
            log_diagnostics: default_log_diagnostics(),
        }
    }
}

fn default_tdc_channels() -> usize {
    TDC_CHANNELS
}
fn default_tdc_max_hits() -> usize {
    TDC_MAX_HITS
}
fn default_fadc_channels() -> usize {
    FADC_CHANNELS
}
fn default_sink_max_values() -> usize {
    4096
}
fn default_log_diagnostics() -> bool {
    true
}

impl From<&DecoderSettings> for Tdc1190Config {
    fn from(settings: &DecoderSettings) -> Self {
        Self {
            channels: settings.tdc_channels,
            max_hits: settings.tdc_max_hits,
            log_diagnostics: settings.log_diagnostics,
        }
    }
}

impl From<&DecoderSettings> for Fadc250Config {
    fn from(settings: &DecoderSettings) -> Self {
        Self {
            channels: settings.fadc_channels,
            log_diagnostics: settings.log_diagnostics,
        }
    }
}

// =============================================================================
// Module Configuration
// =============================================================================

/// One module to decode
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    /// Unique human-readable name
    pub name: String,

    #[serde(default)]
    pub crate_id: u32,

    pub slot: u32,

    /// Registry type id (1190 = V1190 TDC, 250 = FADC250)
    pub type_id: u32,

    /// File of little-endian 32-bit words to decode
    #[serde(default)]
    pub input: Option<PathBuf>,
}

impl ModuleConfig {
    pub fn address(&self) -> ModuleAddress {
        ModuleAddress::new(self.crate_id, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = Config::from_toml("").unwrap();
        assert!(config.modules.is_empty());
        assert_eq!(config.decoder.tdc_channels, 128);
    }

    #[test]
    fn default_settings() {
        let settings = DecoderSettings::default();
        assert_eq!(settings.tdc_channels, 128);
        assert_eq!(settings.tdc_max_hits, 100);
        assert_eq!(settings.fadc_channels, 16);
        assert_eq!(settings.sink_max_values, 4096);
        assert!(settings.log_diagnostics);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[decoder]
tdc_max_hits = 16
log_diagnostics = false

[[modules]]
name = "tdc-left"
crate_id = 1
slot = 3
type_id = 1190
input = "data/tdc.bin"

[[modules]]
name = "fadc-0"
crate_id = 1
slot = 5
type_id = 250
"#;
        let config = Config::from_toml(toml).unwrap();

        // Decoder
        assert_eq!(config.decoder.tdc_max_hits, 16);
        assert_eq!(config.decoder.tdc_channels, 128);
        assert!(!config.decoder.log_diagnostics);

        // Modules
        assert_eq!(config.modules.len(), 2);
        let tdc = config.module("tdc-left").unwrap();
        assert_eq!(tdc.address(), ModuleAddress::new(1, 3));
        assert_eq!(tdc.type_id, 1190);
        assert_eq!(tdc.input.as_deref(), Some(Path::new("data/tdc.bin")));

        let fadc = config.module("fadc-0").unwrap();
        assert!(fadc.input.is_none());
        assert!(config.module("missing").is_none());
    }

    #[test]
    fn settings_convert_to_module_configs() {
        let settings = DecoderSettings {
            tdc_channels: 64,
            tdc_max_hits: 8,
            fadc_channels: 4,
            sink_max_values: 10,
            log_diagnostics: false,
        };
        let tdc = Tdc1190Config::from(&settings);
        assert_eq!(tdc.channels, 64);
        assert_eq!(tdc.max_hits, 8);
        let fadc = Fadc250Config::from(&settings);
        assert_eq!(fadc.channels, 4);
        assert!(!fadc.log_diagnostics);
    }

    #[test]
    fn duplicate_name_rejected() {
        let toml = r#"
[[modules]]
name = "a"
slot = 3
type_id = 1190

[[modules]]
name = "a"
slot = 4
type_id = 1190
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateName(ref n) if n == "a"));
    }

    #[test]
    fn duplicate_address_rejected() {
        let toml = r#"
[[modules]]
name = "a"
slot = 3
type_id = 1190

[[modules]]
name = "b"
slot = 3
type_id = 250
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("crate 0 slot 3"));
    }

    #[test]
    fn missing_slot_is_parse_error() {
        let toml = r#"
[[modules]]
name = "a"
type_id = 1190
"#;
        assert!(matches!(
            Config::from_toml(toml),
            Err(ConfigError::TomlError(_))
        ));
    }
}
