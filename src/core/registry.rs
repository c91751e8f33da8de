//! Centralized component registry
//!
//! This module provides the service locator that maps component names to
//! lazily constructed instances, eliminating the need for cross-module
//! global singletons.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use log::debug;

use crate::component::{builtin_factories, ApplicationComponent, ComponentCreateFn};
use crate::config::ComponentSpec;
use crate::config_error;

use super::error::AppResult;

/// A registry slot: either a configuration descriptor waiting to be
/// constructed, or the memoized instance that replaced it.
#[derive(Clone)]
pub enum ComponentSlot {
    Unconstructed(ComponentSpec),
    Constructed(Arc<dyn ApplicationComponent>),
}

/// Service locator for named application components.
///
/// Names are case-sensitive and unique. A slot starts out as an
/// `Unconstructed` descriptor and is swapped in place for the constructed
/// instance on first resolution; later resolutions return that same
/// instance. Re-registering a name overwrites its slot, discarding any
/// previously memoized instance.
pub struct ComponentRegistry {
    slots: DashMap<String, ComponentSlot>,
    factories: DashMap<String, ComponentCreateFn>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Create a registry seeded with the built-in component factories.
    pub fn new() -> Self {
        let factories = DashMap::new();
        for (type_id, factory) in builtin_factories() {
            factories.insert(type_id.to_string(), factory);
        }
        Self {
            slots: DashMap::new(),
            factories,
        }
    }

    /// Register a factory for a component type identifier.
    pub fn register_factory(&self, type_id: &str, factory: ComponentCreateFn) {
        self.factories.insert(type_id.to_string(), factory);
    }

    /// Bulk-register component descriptors. Merges into the existing
    /// registry: new names are added, existing names are overwritten.
    pub fn set_components(&self, specs: HashMap<String, ComponentSpec>) {
        for (name, spec) in specs {
            self.set_component(name, spec);
        }
    }

    /// Register or overwrite a single component descriptor.
    pub fn set_component(&self, name: String, spec: ComponentSpec) {
        debug!("Registering component descriptor: {name}");
        self.slots.insert(name, ComponentSlot::Unconstructed(spec));
    }

    /// Register an already-constructed instance under a name.
    pub fn set_instance(&self, name: String, instance: Arc<dyn ApplicationComponent>) {
        debug!("Registering component instance: {name}");
        self.slots.insert(name, ComponentSlot::Constructed(instance));
    }

    /// True if a descriptor or instance exists for the name, regardless of
    /// instantiation state.
    pub fn has_component(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// True if the named component has already been constructed.
    pub fn is_constructed(&self, name: &str) -> bool {
        self.slots
            .get(name)
            .map(|slot| matches!(slot.value(), ComponentSlot::Constructed(_)))
            .unwrap_or(false)
    }

    /// Resolve a name to its component instance, constructing it on first
    /// access.
    pub fn get_or_build(&self, name: &str) -> AppResult<Arc<dyn ApplicationComponent>> {
        self.get_or_build_with(name, |_| Ok(()))
    }

    /// Resolve a name to its component instance. When the slot holds an
    /// unconstructed descriptor, `on_built` runs after construction and
    /// before memoization; its failure propagates and leaves the slot
    /// unconstructed.
    ///
    /// The map guard is dropped before the factory and `on_built` run:
    /// constructing a component may re-enter the registry to register or
    /// resolve further components. Resolution assumes one logical thread
    /// of control per name; under a concurrent first-access race the last
    /// memoization wins and construction may run more than once.
    pub fn get_or_build_with<F>(
        &self,
        name: &str,
        on_built: F,
    ) -> AppResult<Arc<dyn ApplicationComponent>>
    where
        F: FnOnce(&Arc<dyn ApplicationComponent>) -> AppResult<()>,
    {
        let spec = match self.slots.get(name) {
            Some(slot) => match slot.value() {
                ComponentSlot::Constructed(instance) => return Ok(instance.clone()),
                ComponentSlot::Unconstructed(spec) => spec.clone(),
            },
            None => {
                return Err(config_error!(
                    "component `{name}` is not registered with the application"
                ))
            }
        };

        let factory = match self.factories.get(&spec.type_id) {
            Some(entry) => *entry.value(),
            None => {
                return Err(config_error!(
                    "component `{name}` names unknown type `{}`",
                    spec.type_id
                ))
            }
        };

        let instance = factory(spec.options.clone())?;
        on_built(&instance)?;

        debug!("Constructed component `{name}` (type `{}`)", spec.type_id);
        self.slots
            .insert(name.to_string(), ComponentSlot::Constructed(instance.clone()));
        Ok(instance)
    }

    /// Names of all registered components, constructed or not.
    pub fn component_names(&self) -> Vec<String> {
        self.slots.iter().map(|entry| entry.key().clone()).collect()
    }
}
