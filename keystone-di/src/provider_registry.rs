//! Activation of [service providers](crate::provider). A [ProviderRegistry] collects providers,
//! orders them by their declared requirements and runs them through two phases: every provider
//! registers its services, then every provider boots. Either phase stops at the first failure.
//!
//! The registry moves through the following states:
//!
//! ```text
//! Pending -> Ordered -> Registering -> Booting -> Active
//!                \            \            \
//!                 +------------+------------+--> Failed
//! ```
//!
//! Ordering failures (missing requirements, cycles) happen before any provider runs, so a
//! registry with a broken dependency graph never registers anything. Deferred hooks can only run
//! once the registry is `Active`.

pub mod graph;

use crate::application::Application;
use crate::error::{ActivationError, DeferredBootError, DeferredBootFailure, ErrorPtr};
use crate::provider::{
    DeferredProviderPtr, ProviderMetadata, ProviderPtr, ServiceProvider,
};
use crate::provider_registry::graph::DependencyGraph;
use derivative::Derivative;
use fxhash::FxHashSet;
use tracing::{debug, info, warn};

/// Lifecycle state of a [ProviderRegistry].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum ActivationState {
    /// Accepting providers.
    #[default]
    Pending,
    /// Providers have been ordered and are about to be registered.
    Ordered,
    Registering,
    Booting,
    /// All providers registered and booted.
    Active,
    /// Ordering, registration or boot failed.
    Failed,
}

/// Describes a provider known to a [ProviderRegistry].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub requires: Vec<&'static str>,
    pub providers: Vec<&'static str>,
    pub deferred: bool,
}

#[derive(Clone)]
enum ProviderEntry {
    Regular(ProviderPtr),
    Deferred(DeferredProviderPtr),
}

impl ProviderEntry {
    fn deferred(&self) -> Option<&DeferredProviderPtr> {
        match self {
            ProviderEntry::Regular(_) => None,
            ProviderEntry::Deferred(provider) => Some(provider),
        }
    }
}

impl ProviderMetadata for ProviderEntry {
    fn name(&self) -> &'static str {
        match self {
            ProviderEntry::Regular(provider) => provider.name(),
            ProviderEntry::Deferred(provider) => provider.name(),
        }
    }

    fn requires(&self) -> Vec<&'static str> {
        match self {
            ProviderEntry::Regular(provider) => provider.requires(),
            ProviderEntry::Deferred(provider) => provider.requires(),
        }
    }

    fn providers(&self) -> Vec<&'static str> {
        match self {
            ProviderEntry::Regular(provider) => provider.providers(),
            ProviderEntry::Deferred(provider) => provider.providers(),
        }
    }
}

impl ServiceProvider for ProviderEntry {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        match self {
            ProviderEntry::Regular(provider) => provider.register(app),
            ProviderEntry::Deferred(provider) => provider.register(app),
        }
    }

    fn boot(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        match self {
            ProviderEntry::Regular(provider) => provider.boot(app),
            ProviderEntry::Deferred(provider) => provider.boot(app),
        }
    }
}

/// Orders and activates service providers. See module-level documentation for details.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ProviderRegistry {
    #[derivative(Debug = "ignore")]
    entries: Vec<ProviderEntry>,
    names: FxHashSet<&'static str>,
    order: Vec<usize>,
    state: ActivationState,
    verify_provided_services: bool,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            names: FxHashSet::default(),
            order: Vec::new(),
            state: ActivationState::Pending,
            verify_provided_services: true,
        }
    }

    /// Controls whether a warning is logged after registration for every declared
    /// [provided key](ProviderMetadata::providers) which did not end up bound. Enabled by default.
    pub fn with_provided_services_verification(mut self, verify: bool) -> Self {
        self.verify_provided_services = verify;
        self
    }

    /// Adds a regular provider. Names must be unique.
    pub fn add(&mut self, provider: ProviderPtr) -> Result<(), ActivationError> {
        self.add_entry(ProviderEntry::Regular(provider))
    }

    /// Adds a provider with a deferred boot hook. Names must be unique.
    pub fn add_deferred(&mut self, provider: DeferredProviderPtr) -> Result<(), ActivationError> {
        self.add_entry(ProviderEntry::Deferred(provider))
    }

    fn add_entry(&mut self, entry: ProviderEntry) -> Result<(), ActivationError> {
        if self.state != ActivationState::Pending {
            return Err(ActivationError::InvalidState(self.state));
        }

        let name = entry.name();
        if !self.names.insert(name) {
            return Err(ActivationError::DuplicateProvider(name.to_string()));
        }

        debug!("Adding service provider: {}", name);

        self.entries.push(entry);
        Ok(())
    }

    #[inline]
    pub fn state(&self) -> ActivationState {
        self.state
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns descriptions of all providers, in the order they were added.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.entries
            .iter()
            .map(|entry| ProviderDescriptor {
                name: entry.name(),
                requires: entry.requires(),
                providers: entry.providers(),
                deferred: entry.deferred().is_some(),
            })
            .collect()
    }

    /// Computes the order in which providers would be activated, without running any of them.
    /// Every provider comes after all providers it requires; otherwise the order of addition is
    /// kept.
    pub fn activation_order(&self) -> Result<Vec<&'static str>, ActivationError> {
        let graph = self.dependency_graph()?;
        Ok(graph
            .topological_order()?
            .into_iter()
            .map(|index| graph.nodes()[index].name)
            .collect())
    }

    /// Registers and then boots all providers in activation order. Can only be called once, in
    /// the `Pending` state.
    pub fn activate(&mut self, app: &dyn Application) -> Result<(), ActivationError> {
        if self.state != ActivationState::Pending {
            return Err(ActivationError::InvalidState(self.state));
        }

        let result = self.run_activation(app);
        if let Err(error) = &result {
            warn!("Service provider activation failed: {}", error);
            self.state = ActivationState::Failed;
        }

        result
    }

    /// Runs deferred boot hooks of all deferred providers in activation order. Every hook runs,
    /// even if a previous one failed; failures are collected and returned together.
    pub fn run_deferred(&self, app: &dyn Application) -> Result<(), DeferredBootError> {
        if self.state != ActivationState::Active {
            return Err(DeferredBootError::Inactive(self.state));
        }

        let failures: Vec<_> = self
            .order
            .iter()
            .filter_map(|index| self.entries[*index].deferred())
            .filter_map(|provider| {
                debug!("Running deferred boot: {}", provider.name());

                provider
                    .deferred_boot(app)
                    .err()
                    .map(|error| DeferredBootFailure {
                        provider: provider.name().to_string(),
                        error,
                    })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            for failure in &failures {
                warn!("{}", failure);
            }

            Err(DeferredBootError::Failed(failures))
        }
    }

    fn dependency_graph(&self) -> Result<DependencyGraph, ActivationError> {
        DependencyGraph::build(
            self.entries
                .iter()
                .map(|entry| (entry.name(), entry.requires())),
        )
    }

    fn run_activation(&mut self, app: &dyn Application) -> Result<(), ActivationError> {
        info!("Ordering {} service providers...", self.entries.len());

        self.order = self.dependency_graph()?.topological_order()?;
        self.state = ActivationState::Ordered;

        info!("Registering service providers...");

        self.state = ActivationState::Registering;
        for index in &self.order {
            let entry = &self.entries[*index];
            debug!("Registering service provider: {}", entry.name());

            entry.register(app).map_err(|error| {
                ActivationError::ProviderRegistrationFailure {
                    provider: entry.name().to_string(),
                    error,
                }
            })?;

            if self.verify_provided_services {
                for key in entry.providers() {
                    if !app.bound(key) {
                        warn!(
                            "Service provider {} declares {}, but did not bind it.",
                            entry.name(),
                            key
                        );
                    }
                }
            }
        }

        info!("Booting service providers...");

        self.state = ActivationState::Booting;
        for index in &self.order {
            let entry = &self.entries[*index];
            debug!("Booting service provider: {}", entry.name());

            entry
                .boot(app)
                .map_err(|error| ActivationError::ProviderBootFailure {
                    provider: entry.name().to_string(),
                    error,
                })?;
        }

        self.state = ActivationState::Active;

        info!("Activated {} service providers.", self.order.len());

        Ok(())
    }
}
