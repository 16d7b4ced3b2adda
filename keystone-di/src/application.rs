//! The [Application] facade is what [service providers](crate::provider) receive when
//! registering and booting. It exposes the underlying [Container] along with object-safe
//! pass-through methods, so providers do not depend on any concrete application type.

use crate::container::Container;
use crate::error::ContainerError;
use crate::instance::{Factory, Instance};
use crate::singleton::singleton_factory;

/// Facade over an application owning a [Container].
pub trait Application: Send + Sync {
    /// Returns the container of this application.
    fn container(&self) -> &Container;

    /// See [Container::bind_factory].
    fn bind_factory(&self, key: &str, factory: Factory) {
        self.container().bind_factory(key, factory);
    }

    /// See [Container::bind_if_factory]. Meant for providers which must not replace services
    /// already registered by the host application.
    fn bind_if_factory(&self, key: &str, factory: Factory) -> bool {
        self.container().bind_if_factory(key, factory)
    }

    /// Object-safe variant of [Container::singleton].
    fn singleton_factory(&self, key: &str, factory: Factory) {
        self.container()
            .bind_factory(key, singleton_factory(key.to_string(), factory));
    }

    /// See [Container::instance].
    fn instance(&self, key: &str, instance: Instance) {
        self.container().instance(key, instance);
    }

    /// See [Container::alias].
    fn alias(&self, key: &str, alias: &str) {
        self.container().alias(key, alias);
    }

    /// See [Container::bound].
    fn bound(&self, key: &str) -> bool {
        self.container().bound(key)
    }

    /// See [Container::make].
    fn make(&self, key: &str) -> Result<Instance, ContainerError> {
        self.container().make(key)
    }

    /// See [Container::must_make].
    fn must_make(&self, key: &str) -> Instance {
        self.container().must_make(key)
    }

    /// See [Container::call_instance].
    fn call_instance(
        &self,
        target: &Instance,
        extra: Vec<Instance>,
    ) -> Result<Vec<Instance>, ContainerError> {
        self.container().call_instance(target, extra)
    }
}

impl Application for Container {
    #[inline]
    fn container(&self) -> &Container {
        self
    }
}
