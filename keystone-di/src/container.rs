//! The [Container] is the central registry of the framework. It maps abstraction keys - stable
//! strings naming logical services - to factories, already constructed instances and aliases.
//!
//! ## Resolution
//!
//! Resolving a key with [Container::make] first substitutes an alias (a single substitution,
//! since alias chains are flattened when registered), then returns a cached instance, if present,
//! and finally falls back to running the registered factory. Instances always take priority over
//! factories registered for the same key.
//!
//! ```
//! use keystone_di::container::Container;
//!
//! let container = Container::new();
//! container.bind("greeting", |_| Ok("hello".to_string()));
//! container.alias("greeting", "welcome");
//!
//! let greeting = container.make_typed::<String>("welcome").unwrap();
//! assert_eq!(*greeting, "hello");
//! ```
//!
//! ## Concurrency
//!
//! The container is meant to be shared, e.g. in an `Arc`. Registration takes an exclusive lock
//! over all mappings, while resolution only takes a shared one. No lock is held while a factory
//! runs, so factories are free to resolve other services from the container they receive.

use crate::error::ContainerError;
use crate::instance::{downcast_instance, erase_factory, into_instance, type_key, Factory, Instance};
use crate::singleton::{singleton_factory, ResolutionTracker};
use derivative::Derivative;
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default, Derivative)]
#[derivative(Debug)]
struct Registry {
    #[derivative(Debug = "ignore")]
    bindings: FxHashMap<String, Factory>,
    instances: FxHashMap<String, Instance>,
    aliases: FxHashMap<String, String>,
    // bumped by every reset
    generation: u64,
}

impl Registry {
    #[inline]
    fn canonical_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map(String::as_str).unwrap_or(key)
    }

    #[inline]
    fn has_entry(&self, key: &str) -> bool {
        self.bindings.contains_key(key) || self.instances.contains_key(key)
    }
}

/// Concurrency-safe registry of bindings, instances and aliases. Please see the module-level
/// documentation for more information.
#[derive(Default, Debug)]
pub struct Container {
    registry: RwLock<Registry>,
    resolutions: Mutex<ResolutionTracker>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a factory for given key, overriding any previous one.
    pub fn bind<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.bind_factory(key, erase_factory(factory));
    }

    /// Type-erased version of [Container::bind].
    pub fn bind_factory(&self, key: impl Into<String>, factory: Factory) {
        let key = key.into();
        if self
            .registry
            .write()
            .bindings
            .insert(key.clone(), factory)
            .is_some()
        {
            debug!("Overriding binding for: {key}");
        }
    }

    /// Registers a factory only if no factory exists for given key. Returns `true` if the factory
    /// has been registered.
    pub fn bind_if<T, F>(&self, key: impl Into<String>, factory: F) -> bool
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.bind_if_factory(key, erase_factory(factory))
    }

    /// Type-erased version of [Container::bind_if].
    pub fn bind_if_factory(&self, key: impl Into<String>, factory: Factory) -> bool {
        match self.registry.write().bindings.entry(key.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(factory);
                true
            }
        }
    }

    /// Registers a factory which gets executed at most once. The resulting value is cached as an
    /// instance for given key. See [crate::singleton] for details.
    pub fn singleton<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        let key = key.into();
        let factory = singleton_factory(key.clone(), erase_factory(factory));
        self.bind_factory(key, factory);
    }

    /// Registers a singleton keyed by the type it produces.
    pub fn singleton_typed<T, F>(&self, factory: F)
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        self.singleton(type_key::<T>(), factory);
    }

    /// Registers an already constructed instance, which takes priority over any factory
    /// registered for given key.
    pub fn instance(&self, key: impl Into<String>, instance: Instance) {
        self.registry.write().instances.insert(key.into(), instance);
    }

    /// Registers an instance keyed by its type, making it injectable into
    /// [callbacks](crate::invoker).
    pub fn instance_typed<T: Any + Send + Sync>(&self, value: T) {
        self.instance(type_key::<T>(), into_instance(value));
    }

    /// Registers `alias` as an alternative name for `key`. If `key` is an alias itself, the new
    /// alias points directly at its target, so resolution never needs to follow chains.
    pub fn alias(&self, key: impl Into<String>, alias: impl Into<String>) {
        let key = key.into();
        let alias = alias.into();

        let mut registry = self.registry.write();
        let target = registry.aliases.get(&key).cloned().unwrap_or(key);
        if target == alias {
            warn!("Ignoring alias pointing at itself: {alias}");
            return;
        }

        for existing in registry.aliases.values_mut() {
            if *existing == alias {
                *existing = target.clone();
            }
        }

        registry.aliases.insert(alias, target);
    }

    /// Checks if given key can be resolved: either directly or as an alias of a bound key.
    pub fn bound(&self, key: &str) -> bool {
        let registry = self.registry.read();
        registry.has_entry(key)
            || registry
                .aliases
                .get(key)
                .map(|target| registry.has_entry(target))
                .unwrap_or(false)
    }

    /// Removes all bindings, instances and aliases.
    pub fn reset(&self) {
        let mut registry = self.registry.write();
        let generation = registry.generation.wrapping_add(1);
        *registry = Registry {
            generation,
            ..Registry::default()
        };
    }

    /// Resolves given key. See the module-level documentation for resolution rules.
    pub fn make(&self, key: &str) -> Result<Instance, ContainerError> {
        let factory = {
            let registry = self.registry.read();
            let key = registry.canonical_key(key);
            if let Some(instance) = registry.instances.get(key) {
                return Ok(instance.clone());
            }

            registry
                .bindings
                .get(key)
                .cloned()
                .ok_or_else(|| ContainerError::BindingNotFound(key.to_string()))?
        };

        factory(self)
    }

    /// Resolves given key like [Container::make], but panics if the key cannot be resolved. Meant
    /// only for dependencies without which the application cannot start.
    pub fn must_make(&self, key: &str) -> Instance {
        self.make(key)
            .unwrap_or_else(|error| panic!("Cannot resolve required service {key}: {error}"))
    }

    /// Typesafe version of [Container::make].
    pub fn make_typed<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ContainerError> {
        self.make(key)
            .and_then(|instance| downcast_instance(key, instance))
    }

    /// Resolves a service keyed by its type.
    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ContainerError> {
        self.make_typed(&type_key::<T>())
    }

    pub(crate) fn cached_instance(&self, key: &str) -> Option<Instance> {
        self.registry.read().instances.get(key).cloned()
    }

    #[inline]
    pub(crate) fn generation(&self) -> u64 {
        self.registry.read().generation
    }

    /// Caches a created instance, unless the container has been reset since `generation`.
    /// Returns `true` if the instance has been cached.
    pub(crate) fn commit_instance(&self, key: &str, instance: Instance, generation: u64) -> bool {
        let mut registry = self.registry.write();
        if registry.generation != generation {
            return false;
        }

        registry.instances.insert(key.to_string(), instance);
        true
    }

    #[inline]
    pub(crate) fn resolutions(&self) -> &Mutex<ResolutionTracker> {
        &self.resolutions
    }
}
