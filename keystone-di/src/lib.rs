//! Runtime service registry. Services are registered in a [Container](container::Container) under
//! string keys as factories, singletons or ready instances, and resolved by key, by type or by
//! auto-wiring the parameters of a callback. Groups of services are registered by
//! [service providers](provider), activated in dependency order by a
//! [ProviderRegistry](provider_registry::ProviderRegistry).
//!
//! ### Features
//!
//! * `derive` - `#[derive(ProviderMetadata)]` for service providers (enabled by default)

pub mod application;
pub mod container;
pub mod error;
pub mod instance;
pub mod invoker;
pub mod provider;
pub mod provider_registry;
pub mod singleton;

#[cfg(feature = "derive")]
pub use keystone_di_derive::ProviderMetadata;
