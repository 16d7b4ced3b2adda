use crate::provider_registry::ActivationState;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Type-erased error produced by caller-supplied code: factories, providers and hooks.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Errors related to resolving services from a [Container](crate::container::Container).
#[derive(Error, Clone, Debug)]
pub enum ContainerError {
    #[error("Binding not found for: {0}")]
    BindingNotFound(String),
    #[error("Call target is not a callback.")]
    NotCallable,
    #[error("Cannot resolve parameter {type_name}: {source}")]
    UnresolvableParameter {
        type_name: String,
        source: Box<ContainerError>,
    },
    #[error("Instance registered for {key} is not of type {expected}")]
    IncompatibleInstance { key: String, expected: &'static str },
    #[error("Singleton {0} requested itself while being constructed")]
    CircularResolution(String),
    #[error("Error constructing service: {0}")]
    Construction(ErrorPtr),
}

impl ContainerError {
    /// Wraps any error raised while constructing a service.
    pub fn construction<E: Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Construction(Arc::new(error))
    }
}

/// Errors related to ordering, registering and booting service providers.
#[derive(Error, Clone, Debug)]
pub enum ActivationError {
    #[error("Attempted to add a duplicated provider with name: {0}")]
    DuplicateProvider(String),
    #[error("Provider {provider} requires missing provider: {required}")]
    MissingRequiredProvider { provider: String, required: String },
    #[error("Circular provider dependency detected: {}", cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
    #[error("Provider registration failed for {provider}: {error}")]
    ProviderRegistrationFailure { provider: String, error: ErrorPtr },
    #[error("Provider boot failed for {provider}: {error}")]
    ProviderBootFailure { provider: String, error: ErrorPtr },
    #[error("Provider activation cannot run in state {0:?}")]
    InvalidState(ActivationState),
}

/// Single failed deferred boot hook.
#[derive(Error, Clone, Debug)]
#[error("Deferred boot failed for {provider}: {error}")]
pub struct DeferredBootFailure {
    pub provider: String,
    pub error: ErrorPtr,
}

/// Errors reported by deferred provider hooks. Never affects already active providers.
#[derive(Error, Clone, Debug)]
pub enum DeferredBootError {
    #[error("Deferred boot requested before providers became active (state: {0:?})")]
    Inactive(ActivationState),
    #[error("{} deferred boot hook(s) failed: {}", .0.len(), .0.iter().map(|failure| failure.to_string()).collect::<Vec<_>>().join("; "))]
    Failed(Vec<DeferredBootFailure>),
}
