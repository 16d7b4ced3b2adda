//! Service providers are the units of modularity: each one registers a group of related services
//! into the [Container](crate::container::Container) and declares which other providers need to be
//! active before it. Providers are activated by a
//! [ProviderRegistry](crate::provider_registry::ProviderRegistry) in two phases - first every
//! provider registers its services, then every provider boots - both in dependency order.
//!
//! ## Declaring providers
//!
//! Provider metadata is usually derived, if the `derive` feature is enabled:
//!
//! ```
//! use keystone_di::application::Application;
//! use keystone_di::error::ErrorPtr;
//! use keystone_di::provider::ServiceProvider;
//! use keystone_di::ProviderMetadata;
//!
//! #[derive(ProviderMetadata)]
//! #[provider(name = "database", requires = ["config"], providers = ["db.connection"])]
//! struct DatabaseProvider;
//!
//! impl ServiceProvider for DatabaseProvider {
//!     fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
//!         app.container()
//!             .singleton("db.connection", |_| Ok("postgres://localhost".to_string()));
//!         Ok(())
//!     }
//! }
//! ```
//!
//! ### Supported `#[provider]` configuration
//!
//! * `name = "name"` - use given name instead of the auto-generated one (snake case type name)
//! * `requires = ["name"]` - names of providers which need to be activated first
//! * `providers = ["key"]` - abstraction keys registered by this provider
//! * `core` - register a `Default` instance of this provider as a core provider, which
//! application loaders can discover without explicit registration
//!
//! ## Deferred providers
//!
//! Providers implementing [DeferredServiceProvider] additionally get a deferred boot hook, run by
//! an external collaborator (e.g. after a request has been handled) once activation completed.

use crate::application::Application;
use crate::error::ErrorPtr;
use itertools::Itertools;
use std::sync::Arc;

pub type ProviderPtr = Arc<dyn ServiceProvider>;

pub type DeferredProviderPtr = Arc<dyn DeferredServiceProvider>;

/// Identification and dependency information of a provider. Typically derived.
pub trait ProviderMetadata {
    /// Unique name of the provider, referenced by other providers in [ProviderMetadata::requires].
    fn name(&self) -> &'static str;

    /// Names of providers which need to be activated before this one.
    fn requires(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Abstraction keys this provider registers. Informational only - not used for ordering.
    fn providers(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// Registers services and performs initialization depending on them. See module-level
/// documentation for details.
pub trait ServiceProvider: ProviderMetadata + Send + Sync {
    /// Registers services of this provider. Called for every provider before any provider boots.
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr>;

    /// Called after all providers have been registered, in the same order.
    fn boot(&self, _app: &dyn Application) -> Result<(), ErrorPtr> {
        Ok(())
    }
}

/// A [ServiceProvider] with an additional hook run after activation.
pub trait DeferredServiceProvider: ServiceProvider {
    /// Runs deferred work. Failures are reported to the caller, but never deactivate anything.
    fn deferred_boot(&self, app: &dyn Application) -> Result<(), ErrorPtr>;
}

#[doc(hidden)]
pub mod internal {
    use crate::provider::ProviderPtr;
    use inventory::collect;
    pub use inventory::submit;

    pub struct CoreProviderRegisterer {
        pub name: &'static str,
        pub create: fn() -> ProviderPtr,
    }

    collect!(CoreProviderRegisterer);
}

/// Returns all providers marked as `core`, sorted by name for a stable activation input order.
pub fn core_providers() -> Vec<ProviderPtr> {
    inventory::iter::<internal::CoreProviderRegisterer>
        .into_iter()
        .sorted_by_key(|registerer| registerer.name)
        .map(|registerer| (registerer.create)())
        .collect()
}
