//! Automatic parameter supply for plain functions and closures.
//!
//! Any function taking up to 8 [CallParameter]s can be invoked with [Container::call]. Each
//! parameter is matched, in declaration order, with the first not yet consumed extra argument of
//! a compatible type. Parameters without a matching extra argument are resolved from the container
//! using their [type key](crate::instance::type_key), so services meant for injection are usually
//! registered with [Container::instance_typed] or [Container::singleton_typed].
//!
//! ```
//! use keystone_di::container::Container;
//! use keystone_di::instance::into_instance;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let container = Container::new();
//! container.instance_typed(Database {
//!     url: "postgres://localhost".to_string(),
//! });
//!
//! let outputs = container
//!     .call(
//!         |database: Arc<Database>, table: Arc<&'static str>| {
//!             format!("{}/{}", database.url, table)
//!         },
//!         vec![into_instance("users")],
//!     )
//!     .unwrap();
//!
//! assert_eq!(
//!     outputs[0].downcast_ref::<String>().unwrap(),
//!     "postgres://localhost/users"
//! );
//! ```
//!
//! Callbacks can also be type-erased into a [Callback], stored in the container like any other
//! service, and later invoked with [Container::call_instance].
//!
//! ### Supported parameter types
//!
//! * `Arc<T>` - required service; resolution failure fails the call
//! * `Option<Arc<T>>` - optional service; `None` if nothing is bound for the type key

use crate::container::Container;
use crate::error::ContainerError;
use crate::instance::{into_instance, type_key, Instance};
use derivative::Derivative;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Extra arguments supplied to a single call. Each argument can be consumed at most once.
#[derive(Debug, Default)]
pub struct ExtraArguments {
    arguments: Vec<Option<Instance>>,
}

impl ExtraArguments {
    pub fn new(arguments: Vec<Instance>) -> Self {
        Self {
            arguments: arguments.into_iter().map(Some).collect(),
        }
    }

    /// Takes the first unconsumed argument of type `T`.
    pub fn take<T: Any + Send + Sync>(&mut self) -> Option<Arc<T>> {
        self.arguments
            .iter_mut()
            .find(|argument| {
                argument
                    .as_ref()
                    .map(|argument| argument.is::<T>())
                    .unwrap_or(false)
            })
            .and_then(Option::take)
            .and_then(|argument| argument.downcast().ok())
    }

    /// Returns the number of arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.arguments.iter().filter(|argument| argument.is_some()).count()
    }
}

impl From<Vec<Instance>> for ExtraArguments {
    fn from(arguments: Vec<Instance>) -> Self {
        Self::new(arguments)
    }
}

/// A parameter of a function invoked by [Container::call].
pub trait CallParameter: Sized {
    /// Abstraction key used when resolving this parameter from a container.
    fn type_key() -> String;

    /// Takes this parameter from extra arguments, if a compatible one is available.
    fn take(arguments: &mut ExtraArguments) -> Option<Self>;

    /// Resolves this parameter from given container.
    fn resolve(container: &Container) -> Result<Self, ContainerError>;
}

impl<T: Any + Send + Sync> CallParameter for Arc<T> {
    #[inline]
    fn type_key() -> String {
        type_key::<T>()
    }

    #[inline]
    fn take(arguments: &mut ExtraArguments) -> Option<Self> {
        arguments.take::<T>()
    }

    #[inline]
    fn resolve(container: &Container) -> Result<Self, ContainerError> {
        container.resolve::<T>()
    }
}

impl<T: Any + Send + Sync> CallParameter for Option<Arc<T>> {
    #[inline]
    fn type_key() -> String {
        type_key::<T>()
    }

    #[inline]
    fn take(arguments: &mut ExtraArguments) -> Option<Self> {
        arguments.take::<T>().map(Some)
    }

    fn resolve(container: &Container) -> Result<Self, ContainerError> {
        match container.resolve::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(ContainerError::BindingNotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Supplies a single parameter: from extra arguments first, then from the container.
fn supply<P: CallParameter>(
    container: &Container,
    arguments: &mut ExtraArguments,
) -> Result<P, ContainerError> {
    if let Some(parameter) = P::take(arguments) {
        return Ok(parameter);
    }

    P::resolve(container).map_err(|error| ContainerError::UnresolvableParameter {
        type_name: P::type_key(),
        source: Box::new(error),
    })
}

/// Converts a function result into the output sequence of a call. Unit results produce no
/// outputs.
fn into_outputs<O: Any + Send + Sync>(output: O) -> Vec<Instance> {
    if TypeId::of::<O>() == TypeId::of::<()>() {
        Vec::new()
    } else {
        vec![into_instance(output)]
    }
}

type InvokeFunction =
    dyn Fn(&Container, &mut ExtraArguments) -> Result<Vec<Instance>, ContainerError> + Send + Sync;

/// Type-erased function with automatically supplied parameters.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Callback {
    parameters: Vec<String>,
    #[derivative(Debug = "ignore")]
    invoke: Box<InvokeFunction>,
}

impl Callback {
    /// Erases given function.
    pub fn new<Args, F: IntoCallback<Args>>(function: F) -> Self {
        function.into_callback()
    }

    /// Returns type keys of all parameters, in declaration order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Invokes the callback, supplying parameters from `arguments` or `container`.
    pub fn invoke(
        &self,
        container: &Container,
        arguments: &mut ExtraArguments,
    ) -> Result<Vec<Instance>, ContainerError> {
        (self.invoke)(container, arguments)
    }
}

/// Conversion of functions into [Callback]s. Implemented for all functions and closures taking
/// up to 8 [CallParameter]s and returning a `Send + Sync + 'static` value.
pub trait IntoCallback<Args> {
    fn into_callback(self) -> Callback;
}

macro_rules! impl_into_callback {
    ($($parameter:ident),*) => {
        impl<Function, Output, $($parameter,)*> IntoCallback<($($parameter,)*)> for Function
        where
            Function: Fn($($parameter),*) -> Output + Send + Sync + 'static,
            Output: Any + Send + Sync,
            $($parameter: CallParameter,)*
        {
            #[allow(non_snake_case, unused_variables)]
            fn into_callback(self) -> Callback {
                Callback {
                    parameters: vec![$($parameter::type_key()),*],
                    invoke: Box::new(move |container: &Container, arguments: &mut ExtraArguments|
                        -> Result<Vec<Instance>, ContainerError> {
                        $(let $parameter = supply::<$parameter>(container, arguments)?;)*
                        Ok(into_outputs(self($($parameter),*)))
                    }),
                }
            }
        }
    };
}

impl_into_callback!();
impl_into_callback!(P1);
impl_into_callback!(P1, P2);
impl_into_callback!(P1, P2, P3);
impl_into_callback!(P1, P2, P3, P4);
impl_into_callback!(P1, P2, P3, P4, P5);
impl_into_callback!(P1, P2, P3, P4, P5, P6);
impl_into_callback!(P1, P2, P3, P4, P5, P6, P7);
impl_into_callback!(P1, P2, P3, P4, P5, P6, P7, P8);

impl Container {
    /// Calls given function, supplying its parameters from `extra` arguments or this container.
    /// Returns the outputs of the function: none for `()`, otherwise a single value.
    pub fn call<Args, F: IntoCallback<Args>>(
        &self,
        function: F,
        extra: Vec<Instance>,
    ) -> Result<Vec<Instance>, ContainerError> {
        function
            .into_callback()
            .invoke(self, &mut ExtraArguments::new(extra))
    }

    /// Calls a type-erased target, which needs to be a [Callback]. Useful for callbacks resolved
    /// from the container itself.
    pub fn call_instance(
        &self,
        target: &Instance,
        extra: Vec<Instance>,
    ) -> Result<Vec<Instance>, ContainerError> {
        target
            .downcast_ref::<Callback>()
            .ok_or(ContainerError::NotCallable)?
            .invoke(self, &mut ExtraArguments::new(extra))
    }
}

#[cfg(test)]
mod tests {
    use crate::container::Container;
    use crate::error::ContainerError;
    use crate::instance::{into_instance, type_key, Instance};
    use crate::invoker::{Callback, ExtraArguments};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct DependencyA {
        value: String,
    }

    struct DependencyB {
        dependency_a: Arc<DependencyA>,
    }

    #[test]
    fn should_resolve_parameter_from_container() {
        let container = Container::new();
        container.instance(
            type_key::<DependencyA>(),
            into_instance(DependencyA {
                value: "A".to_string(),
            }),
        );

        let outputs = container
            .call(|a: Arc<DependencyA>| a.value.clone(), vec![])
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].downcast_ref::<String>().unwrap(), "A");
    }

    #[test]
    fn should_prefer_extra_arguments() {
        let container = Container::new();
        container.instance_typed(1_i32);

        let outputs = container
            .call(|value: Arc<i32>| *value, vec![into_instance(2_i32)])
            .unwrap();

        assert_eq!(outputs[0].downcast_ref::<i32>(), Some(&2));
    }

    #[test]
    fn should_consume_extra_arguments_in_order() {
        let container = Container::new();

        let outputs = container
            .call(
                |first: Arc<i32>, second: Arc<i32>, text: Arc<String>| {
                    format!("{first}-{second}-{text}")
                },
                vec![
                    into_instance("text".to_string()),
                    into_instance(1_i32),
                    into_instance(2_i32),
                ],
            )
            .unwrap();

        assert_eq!(outputs[0].downcast_ref::<String>().unwrap(), "1-2-text");
    }

    #[test]
    fn should_mix_extra_arguments_and_services() {
        let container = Container::new();
        container.singleton_typed(|_| {
            Ok(DependencyA {
                value: "from container".to_string(),
            })
        });
        container.singleton_typed(|container| {
            Ok(DependencyB {
                dependency_a: container.resolve::<DependencyA>()?,
            })
        });

        let outputs = container
            .call(
                |b: Arc<DependencyB>, suffix: Arc<&'static str>| {
                    format!("{} {}", b.dependency_a.value, suffix)
                },
                vec![into_instance("and arguments")],
            )
            .unwrap();

        assert_eq!(
            outputs[0].downcast_ref::<String>().unwrap(),
            "from container and arguments"
        );
    }

    #[test]
    fn should_not_resolve_missing_parameter() {
        let container = Container::new();

        let error = container
            .call(|_: Arc<DependencyA>| (), vec![])
            .unwrap_err();

        assert!(matches!(
            error,
            ContainerError::UnresolvableParameter { ref type_name, ref source }
                if *type_name == type_key::<DependencyA>()
                    && matches!(**source, ContainerError::BindingNotFound(_))
        ));
    }

    #[test]
    fn should_not_call_function_when_parameter_is_missing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();

        let result = {
            let calls = calls.clone();
            container.call(
                move |_: Arc<i8>, _: Arc<DependencyA>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                },
                vec![into_instance(1_i8)],
            )
        };

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_supply_optional_parameters() {
        let container = Container::new();
        container.instance_typed(5_u8);

        let outputs = container
            .call(
                |present: Option<Arc<u8>>, missing: Option<Arc<DependencyA>>| {
                    (present.map(|value| *value), missing.is_none())
                },
                vec![],
            )
            .unwrap();

        assert_eq!(
            outputs[0].downcast_ref::<(Option<u8>, bool)>(),
            Some(&(Some(5), true))
        );
    }

    #[test]
    fn should_return_no_outputs_for_unit() {
        let container = Container::new();
        let outputs = container.call(|| {}, vec![]).unwrap();

        assert!(outputs.is_empty());
    }

    #[test]
    fn should_call_stored_callback() {
        let container = Container::new();
        container.instance_typed(3_i64);
        container.instance(
            "handler",
            into_instance(Callback::new(|value: Arc<i64>| *value * 2)),
        );

        let handler = container.make("handler").unwrap();
        let outputs = container.call_instance(&handler, vec![]).unwrap();

        assert_eq!(outputs[0].downcast_ref::<i64>(), Some(&6));
    }

    #[test]
    fn should_not_call_non_callable_target() {
        let container = Container::new();
        let target: Instance = into_instance("not-a-function");

        assert!(matches!(
            container.call_instance(&target, vec![]).unwrap_err(),
            ContainerError::NotCallable
        ));
    }

    #[test]
    fn should_describe_parameters() {
        let callback = Callback::new(|_: Arc<i8>, _: Option<Arc<String>>| ());

        assert_eq!(
            callback.parameters(),
            &[type_key::<i8>(), type_key::<String>()]
        );
    }

    #[test]
    fn should_track_consumed_arguments() {
        let mut arguments = ExtraArguments::new(vec![into_instance(1_i8), into_instance(2_u8)]);

        assert_eq!(arguments.take::<u8>().map(|value| *value), Some(2));
        assert!(arguments.take::<u8>().is_none());
        assert_eq!(arguments.remaining(), 1);
    }
}
