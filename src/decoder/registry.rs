//! Module type registry
//!
//! Maps hardware type ids to factories. The registry is an ordinary value:
//! build it once (usually with [`ModuleRegistry::with_builtin`]) and pass it
//! to whatever needs to create modules.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use super::common::ModuleAddress;
use super::fadc250::{self, Fadc250Config, Fadc250Module};
use super::module::Module;
use super::tdc1190::{self, Tdc1190Config, Tdc1190Module};
use crate::config::DecoderSettings;

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("type id {type_id} already registered as \"{existing}\"")]
    Duplicate { type_id: u32, existing: &'static str },

    #[error("no module registered for type id {0}")]
    UnknownType(u32),
}

/// Constructor for one module kind
pub type ModuleFactory = fn(ModuleAddress, &DecoderSettings) -> Module;

/// A registered module kind
#[derive(Clone, Copy, Serialize)]
pub struct ModuleType {
    pub type_id: u32,
    pub name: &'static str,
    #[serde(skip)]
    factory: ModuleFactory,
}

impl fmt::Debug for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleType")
            .field("type_id", &self.type_id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registered module kinds keyed by type id
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    types: BTreeMap<u32, ModuleType>,
}

impl ModuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the V1190 TDC (1190) and FADC250 (250)
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [(u32, &'static str, ModuleFactory); 2] = [
            (tdc1190::TYPE_ID, Tdc1190Module::NAME, create_tdc1190),
            (fadc250::TYPE_ID, Fadc250Module::NAME, create_fadc250),
        ];
        for (type_id, name, factory) in builtin {
            registry.insert(type_id, name, factory);
        }
        registry
    }

    /// Add a module kind; an id can only be registered once
    pub fn register(
        &mut self,
        type_id: u32,
        name: &'static str,
        factory: ModuleFactory,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.types.get(&type_id) {
            return Err(RegistryError::Duplicate {
                type_id,
                existing: existing.name,
            });
        }
        self.insert(type_id, name, factory);
        Ok(())
    }

    fn insert(&mut self, type_id: u32, name: &'static str, factory: ModuleFactory) {
        debug!(type_id, name, "Registered module type");
        self.types.insert(
            type_id,
            ModuleType {
                type_id,
                name,
                factory,
            },
        );
    }

    /// Create a fresh decoder instance for a type id
    pub fn create(
        &self,
        type_id: u32,
        address: ModuleAddress,
        settings: &DecoderSettings,
    ) -> Result<Module, RegistryError> {
        let entry = self
            .types
            .get(&type_id)
            .ok_or(RegistryError::UnknownType(type_id))?;
        Ok((entry.factory)(address, settings))
    }

    pub fn contains(&self, type_id: u32) -> bool {
        self.types.contains_key(&type_id)
    }

    pub fn name(&self, type_id: u32) -> Option<&'static str> {
        self.types.get(&type_id).map(|t| t.name)
    }

    /// Registered kinds in type id order
    pub fn types(&self) -> impl Iterator<Item = &ModuleType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn create_tdc1190(address: ModuleAddress, settings: &DecoderSettings) -> Module {
    Module::Tdc1190(Tdc1190Module::new(address, Tdc1190Config::from(settings)))
}

fn create_fadc250(address: ModuleAddress, settings: &DecoderSettings) -> Module {
    Module::Fadc250(Fadc250Module::new(address, Fadc250Config::from(settings)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::module::ModuleDecoder;

    #[test]
    fn test_builtin_types() {
        let registry = ModuleRegistry::with_builtin();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(1190));
        assert!(registry.contains(250));
        assert_eq!(registry.name(250), Some("JLab FADC 250 Module"));
        let ids: Vec<u32> = registry.types().map(|t| t.type_id).collect();
        assert_eq!(ids, vec![250, 1190]);
    }

    #[test]
    fn test_create_by_type_id() {
        let registry = ModuleRegistry::with_builtin();
        let settings = DecoderSettings::default();
        let address = ModuleAddress::new(2, 7);

        let tdc = registry.create(1190, address, &settings).unwrap();
        assert!(tdc.as_tdc1190().is_some());
        assert_eq!(tdc.address(), address);

        let fadc = registry.create(250, address, &settings).unwrap();
        assert!(fadc.as_fadc250().is_some());
        assert!(fadc.is_multi_function());
    }

    #[test]
    fn test_settings_reach_module() {
        let registry = ModuleRegistry::with_builtin();
        let settings = DecoderSettings {
            tdc_channels: 8,
            tdc_max_hits: 2,
            ..Default::default()
        };
        let module = registry
            .create(1190, ModuleAddress::new(0, 1), &settings)
            .unwrap();
        let tdc = module.as_tdc1190().unwrap();
        assert_eq!(tdc.hits().n_channels(), 8);
        assert_eq!(tdc.hits().max_hits(), 2);
    }

    #[test]
    fn test_unknown_type() {
        let registry = ModuleRegistry::with_builtin();
        let err = registry
            .create(792, ModuleAddress::default(), &DecoderSettings::default())
            .unwrap_err();
        assert_eq!(err, RegistryError::UnknownType(792));
        assert!(err.to_string().contains("792"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ModuleRegistry::with_builtin();
        let err = registry
            .register(1190, "Another TDC", create_tdc1190)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                type_id: 1190,
                existing: "Caen TDC 1190 Module"
            }
        );
        assert_eq!(registry.name(1190), Some("Caen TDC 1190 Module"));
    }

    #[test]
    fn test_register_extra_type() {
        let mut registry = ModuleRegistry::with_builtin();
        registry.register(1191, "Spare TDC", create_tdc1190).unwrap();
        assert_eq!(registry.len(), 3);
        let module = registry
            .create(1191, ModuleAddress::new(0, 4), &DecoderSettings::default())
            .unwrap();
        assert!(module.as_tdc1190().is_some());
    }

    #[test]
    fn test_empty_registry() {
        let registry = ModuleRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.create(250, ModuleAddress::default(), &DecoderSettings::default()).is_err());
    }
}
