//! Core application functionality. An [App] owns the [Container] with all services and the
//! [ProviderRegistry] activating service providers. Providers are registered first (usually through
//! a [ModuleLoader](crate::loader::ModuleLoader)), then the application is booted, which activates
//! all providers in dependency order.

use crate::config::ApplicationConfig;
use config::ConfigError;
use keystone_di::application::Application;
use keystone_di::container::Container;
use keystone_di::error::{ActivationError, DeferredBootError};
use keystone_di::provider::{DeferredProviderPtr, ProviderPtr};
use keystone_di::provider_registry::{ActivationState, ProviderDescriptor, ProviderRegistry};
use std::any::TypeId;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Error loading configuration: {0}")]
    Configuration(Arc<ConfigError>),
    #[error("Error activating providers: {0}")]
    Activation(#[from] ActivationError),
    #[error("Error running deferred boot: {0}")]
    DeferredBoot(#[from] DeferredBootError),
    #[error("Unsupported module type: {0:?}")]
    UnsupportedModule(TypeId),
}

/// Main entrypoint for the application.
#[derive(Debug)]
pub struct App {
    container: Container,
    providers: ProviderRegistry,
    config: ApplicationConfig,
}

impl App {
    /// Creates an application with given config, which becomes available in the container.
    pub fn new(config: ApplicationConfig) -> Self {
        let container = Container::new();
        container.instance_typed(config.clone());

        Self {
            container,
            providers: ProviderRegistry::new()
                .with_provided_services_verification(config.verify_provided_services),
            config,
        }
    }

    /// Creates an application with config loaded from the environment. See
    /// [ApplicationConfig::init_from_environment].
    pub fn from_environment() -> Result<Self, ApplicationError> {
        ApplicationConfig::init_from_environment()
            .map(Self::new)
            .map_err(|error| ApplicationError::Configuration(Arc::new(error)))
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    pub fn register_provider(&mut self, provider: ProviderPtr) -> Result<(), ApplicationError> {
        self.providers.add(provider).map_err(Into::into)
    }

    pub fn register_deferred_provider(
        &mut self,
        provider: DeferredProviderPtr,
    ) -> Result<(), ApplicationError> {
        self.providers.add_deferred(provider).map_err(Into::into)
    }

    /// Installs the default logger, if configured, and activates all registered providers.
    pub fn boot(&mut self) -> Result<(), ApplicationError> {
        if self.config.install_tracing_logger {
            install_tracing_logger(&self.config.log_filter);
        }

        info!("Booting application...");

        self.providers.activate(&self.container)?;

        info!("Application booted.");
        Ok(())
    }

    /// Runs deferred boot hooks. Should be called by whatever drives the application, e.g. after
    /// handling a request, once the application has booted.
    pub fn run_deferred(&self) -> Result<(), ApplicationError> {
        self.providers
            .run_deferred(&self.container)
            .map_err(Into::into)
    }

    #[inline]
    pub fn is_booted(&self) -> bool {
        self.providers.state() == ActivationState::Active
    }

    #[inline]
    pub fn activation_state(&self) -> ActivationState {
        self.providers.state()
    }

    /// Describes all registered providers.
    pub fn providers(&self) -> Vec<ProviderDescriptor> {
        self.providers.descriptors()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(ApplicationConfig::default())
    }
}

impl Application for App {
    #[inline]
    fn container(&self) -> &Container {
        &self.container
    }
}

fn install_tracing_logger(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_err()
    {
        debug!("Global tracing subscriber already installed - keeping it.");
    }
}

#[cfg(test)]
mod tests {
    use crate::application::{App, ApplicationError};
    use crate::config::ApplicationConfig;
    use keystone_di::application::Application;
    use keystone_di::error::{ActivationError, DeferredBootError, ErrorPtr};
    use keystone_di::instance::into_instance;
    use keystone_di::provider::{DeferredServiceProvider, ProviderMetadata, ServiceProvider};
    use keystone_di::provider_registry::ActivationState;
    use mockall::mock;
    use std::sync::Arc;

    mock! {
        Provider {}

        impl ProviderMetadata for Provider {
            fn name(&self) -> &'static str;
            fn requires(&self) -> Vec<&'static str>;
            fn providers(&self) -> Vec<&'static str>;
        }

        impl ServiceProvider for Provider {
            fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr>;
            fn boot(&self, app: &dyn Application) -> Result<(), ErrorPtr>;
        }

        impl DeferredServiceProvider for Provider {
            fn deferred_boot(&self, app: &dyn Application) -> Result<(), ErrorPtr>;
        }
    }

    fn test_config() -> ApplicationConfig {
        let mut config = ApplicationConfig::default();
        config.install_tracing_logger = false;
        config
    }

    fn mock_provider(name: &'static str) -> MockProvider {
        let mut provider = MockProvider::new();
        provider.expect_name().return_const(name);
        provider.expect_requires().returning(Vec::new);
        provider.expect_providers().returning(Vec::new);
        provider
    }

    #[test]
    fn should_register_config() {
        let config = test_config();
        let app = App::new(config.clone());

        assert_eq!(*app.container().resolve::<ApplicationConfig>().unwrap(), config);
    }

    #[test]
    fn should_boot_providers() {
        let mut provider = mock_provider("service");
        provider.expect_register().times(1).returning(|app| {
            app.instance("service", into_instance(1_i8));
            Ok(())
        });
        provider.expect_boot().times(1).returning(|app| {
            assert!(app.bound("service"));
            Ok(())
        });

        let mut app = App::new(test_config());
        app.register_provider(Arc::new(provider)).unwrap();

        assert!(!app.is_booted());
        app.boot().unwrap();

        assert!(app.is_booted());
        assert_eq!(app.make("service").unwrap().downcast_ref::<i8>(), Some(&1));
    }

    #[test]
    fn should_report_activation_failure() {
        let mut provider = MockProvider::new();
        provider.expect_name().return_const("service");
        provider.expect_requires().returning(|| vec!["missing"]);
        provider.expect_providers().returning(Vec::new);
        provider.expect_register().never();

        let mut app = App::new(test_config());
        app.register_provider(Arc::new(provider)).unwrap();

        assert!(matches!(
            app.boot().unwrap_err(),
            ApplicationError::Activation(ActivationError::MissingRequiredProvider { .. })
        ));
        assert_eq!(app.activation_state(), ActivationState::Failed);
    }

    #[test]
    fn should_run_deferred_only_after_boot() {
        let mut provider = mock_provider("deferred");
        provider.expect_register().times(1).returning(|_| Ok(()));
        provider.expect_boot().times(1).returning(|_| Ok(()));
        provider.expect_deferred_boot().times(1).returning(|_| Ok(()));

        let mut app = App::new(test_config());
        app.register_deferred_provider(Arc::new(provider)).unwrap();

        assert!(matches!(
            app.run_deferred().unwrap_err(),
            ApplicationError::DeferredBoot(DeferredBootError::Inactive(ActivationState::Pending))
        ));

        app.boot().unwrap();
        app.run_deferred().unwrap();
    }

    #[test]
    fn should_describe_providers() {
        let mut app = App::new(test_config());
        app.register_provider(Arc::new(mock_provider("service")))
            .unwrap();

        let descriptors = app.providers();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "service");
        assert!(!descriptors[0].deferred);
    }
}
