//! Type-erased service values and the type tags used to key them.

use crate::container::Container;
use crate::error::ContainerError;
use std::any::{type_name, Any};
use std::sync::Arc;

/// A resolved service. All consumers of a given key share the same allocation.
pub type Instance = Arc<dyn Any + Send + Sync + 'static>;

/// Type-erased factory stored in a [Container].
pub type Factory = Arc<dyn Fn(&Container) -> Result<Instance, ContainerError> + Send + Sync>;

/// Returns the stable abstraction key used when resolving services by type.
#[inline]
pub fn type_key<T: ?Sized + 'static>() -> String {
    type_name::<T>().to_string()
}

/// Wraps a value in an [Instance], e.g. to pass it as an extra argument to
/// [Container::call](crate::container::Container::call).
#[inline]
pub fn into_instance<T: Any + Send + Sync>(value: T) -> Instance {
    Arc::new(value) as Instance
}

/// Turns a typed factory closure into a type-erased [Factory].
pub(crate) fn erase_factory<T, F>(factory: F) -> Factory
where
    T: Any + Send + Sync,
    F: Fn(&Container) -> Result<T, ContainerError> + Send + Sync + 'static,
{
    Arc::new(move |container: &Container| factory(container).map(into_instance))
}

/// Downcasts an [Instance] resolved for `key` into a concrete type.
pub(crate) fn downcast_instance<T: Any + Send + Sync>(
    key: &str,
    instance: Instance,
) -> Result<Arc<T>, ContainerError> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::IncompatibleInstance {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use crate::error::ContainerError;
    use crate::instance::{downcast_instance, into_instance, type_key};

    struct TestService;

    #[test]
    fn should_use_type_name_as_key() {
        assert_eq!(type_key::<TestService>(), std::any::type_name::<TestService>());
        assert_ne!(type_key::<TestService>(), type_key::<i8>());
    }

    #[test]
    fn should_downcast_compatible_instance() {
        let instance = into_instance(5_i8);
        assert_eq!(*downcast_instance::<i8>("key", instance).unwrap(), 5);
    }

    #[test]
    fn should_not_downcast_incompatible_instance() {
        let instance = into_instance(5_i8);
        assert!(matches!(
            downcast_instance::<u8>("key", instance).unwrap_err(),
            ContainerError::IncompatibleInstance { key, .. } if key == "key"
        ));
    }
}
