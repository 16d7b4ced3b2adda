//! Loading modules into an [App]. A module is a [ProviderPtr] or a [DeferredProviderPtr] passed
//! as `Box<dyn Any>`, which allows loading heterogeneous module lists. Modules need to be loaded
//! before the application is bootstrapped.
//!
//! ```
//! use keystone::application::App;
//! use keystone::loader::{ApplicationModuleLoader, ModuleLoader};
//! use keystone_di::application::Application;
//! use keystone_di::error::ErrorPtr;
//! use keystone_di::provider::{ProviderPtr, ServiceProvider};
//! use keystone_di::ProviderMetadata;
//! use std::any::Any;
//! use std::sync::Arc;
//!
//! #[derive(ProviderMetadata)]
//! #[provider(requires = ["config"])]
//! struct GreetingProvider;
//!
//! impl ServiceProvider for GreetingProvider {
//!     fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
//!         app.container().bind("greeting", |_| Ok("Hello!"));
//!         Ok(())
//!     }
//! }
//!
//! let mut app = App::default();
//! let mut loader = ApplicationModuleLoader::new(&mut app);
//!
//! loader
//!     .load_modules(vec![Box::new(Arc::new(GreetingProvider) as ProviderPtr) as Box<dyn Any>])
//!     .unwrap();
//! loader.bootstrap_application().unwrap();
//!
//! assert!(app.is_booted());
//! assert!(app.bound("greeting"));
//! ```

use crate::application::{App, ApplicationError};
use derive_more::Constructor;
use keystone_di::provider::{core_providers, DeferredProviderPtr, ProviderPtr};
use std::any::Any;
use tracing::{debug, info};

/// Loads modules into an application.
pub trait ModuleLoader {
    /// Registers core providers and boots the application.
    fn bootstrap_application(&mut self) -> Result<(), ApplicationError>;

    /// Registers all [core providers](keystone_di::provider::core_providers), unless a provider
    /// with the same name is already registered.
    fn register_core_providers(&mut self) -> Result<(), ApplicationError>;

    /// Loads a single module. Fails with [ApplicationError::UnsupportedModule] if the module is not
    /// a provider.
    fn load_module(&mut self, module: Box<dyn Any>) -> Result<(), ApplicationError>;

    /// Loads given modules in order, stopping at the first failure.
    fn load_modules(&mut self, modules: Vec<Box<dyn Any>>) -> Result<(), ApplicationError> {
        modules
            .into_iter()
            .try_for_each(|module| self.load_module(module))
    }
}

/// [ModuleLoader] for an [App].
#[derive(Constructor)]
pub struct ApplicationModuleLoader<'a> {
    app: &'a mut App,
}

impl ModuleLoader for ApplicationModuleLoader<'_> {
    fn bootstrap_application(&mut self) -> Result<(), ApplicationError> {
        self.register_core_providers()?;
        self.app.boot()
    }

    fn register_core_providers(&mut self) -> Result<(), ApplicationError> {
        info!("Registering core providers...");

        let registered: Vec<_> = self
            .app
            .providers()
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect();

        for provider in core_providers() {
            if registered.contains(&provider.name()) {
                debug!(
                    "Skipping core provider {} - already registered.",
                    provider.name()
                );
                continue;
            }

            self.app.register_provider(provider)?;
        }

        Ok(())
    }

    fn load_module(&mut self, module: Box<dyn Any>) -> Result<(), ApplicationError> {
        let module = match module.downcast::<ProviderPtr>() {
            Ok(provider) => return self.app.register_provider(*provider),
            Err(module) => module,
        };

        match module.downcast::<DeferredProviderPtr>() {
            Ok(provider) => self.app.register_deferred_provider(*provider),
            Err(module) => Err(ApplicationError::UnsupportedModule((*module).type_id())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::application::{App, ApplicationError};
    use crate::config::{ApplicationConfig, CONFIG_ALIAS};
    use crate::loader::{ApplicationModuleLoader, ModuleLoader};
    use keystone_di::application::Application;
    use keystone_di::error::{ActivationError, ErrorPtr};
    use keystone_di::provider::{
        DeferredProviderPtr, DeferredServiceProvider, ProviderMetadata, ProviderPtr,
        ServiceProvider,
    };
    use std::any::{Any, TypeId};
    use std::sync::Arc;

    struct TestProvider(&'static str);

    impl ProviderMetadata for TestProvider {
        fn name(&self) -> &'static str {
            self.0
        }
    }

    impl ServiceProvider for TestProvider {
        fn register(&self, _app: &dyn Application) -> Result<(), ErrorPtr> {
            Ok(())
        }
    }

    impl DeferredServiceProvider for TestProvider {
        fn deferred_boot(&self, _app: &dyn Application) -> Result<(), ErrorPtr> {
            Ok(())
        }
    }

    fn test_app() -> App {
        let mut config = ApplicationConfig::default();
        config.install_tracing_logger = false;
        App::new(config)
    }

    fn module(name: &'static str) -> Box<dyn Any> {
        Box::new(Arc::new(TestProvider(name)) as ProviderPtr)
    }

    fn deferred_module(name: &'static str) -> Box<dyn Any> {
        Box::new(Arc::new(TestProvider(name)) as DeferredProviderPtr)
    }

    #[test]
    fn should_load_provider_modules() {
        let mut app = test_app();
        ApplicationModuleLoader::new(&mut app)
            .load_modules(vec![module("regular"), deferred_module("deferred")])
            .unwrap();

        let descriptors = app.providers();
        assert_eq!(descriptors.len(), 2);
        assert!(!descriptors[0].deferred);
        assert!(descriptors[1].deferred);
    }

    #[test]
    fn should_reject_unsupported_module() {
        let mut app = test_app();

        assert!(matches!(
            ApplicationModuleLoader::new(&mut app).load_module(Box::new(5_i32)).unwrap_err(),
            ApplicationError::UnsupportedModule(type_id) if type_id == TypeId::of::<i32>()
        ));
    }

    #[test]
    fn should_stop_loading_at_first_failure() {
        let mut app = test_app();

        assert!(ApplicationModuleLoader::new(&mut app)
            .load_modules(vec![
                module("first"),
                Box::new("invalid") as Box<dyn Any>,
                module("second"),
            ])
            .is_err());
        assert_eq!(app.providers().len(), 1);
    }

    #[test]
    fn should_reject_duplicate_modules() {
        let mut app = test_app();

        assert!(matches!(
            ApplicationModuleLoader::new(&mut app)
                .load_modules(vec![module("same"), module("same")])
                .unwrap_err(),
            ApplicationError::Activation(ActivationError::DuplicateProvider(name)) if name == "same"
        ));
    }

    #[test]
    fn should_bootstrap_with_core_providers() {
        let mut app = test_app();
        let mut loader = ApplicationModuleLoader::new(&mut app);
        loader.load_module(module("regular")).unwrap();
        loader.bootstrap_application().unwrap();

        assert!(app.is_booted());
        assert!(app.providers().iter().any(|descriptor| descriptor.name == "config"));
        assert_eq!(
            *app.container()
                .make_typed::<ApplicationConfig>(CONFIG_ALIAS)
                .unwrap(),
            *app.config()
        );
    }

    #[test]
    fn should_not_register_core_providers_twice() {
        let mut app = test_app();
        let mut loader = ApplicationModuleLoader::new(&mut app);
        loader.register_core_providers().unwrap();
        loader.register_core_providers().unwrap();

        assert_eq!(
            app.providers()
                .iter()
                .filter(|descriptor| descriptor.name == "config")
                .count(),
            1
        );
    }
}
