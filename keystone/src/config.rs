//! Framework configuration is represented by [ApplicationConfig], which
//! [App](crate::application::App) uses to configure itself. The config is also available to any
//! service through the container, registered by the built-in [ConfigServiceProvider] under its
//! [type key](keystone_di::instance::type_key) and the [CONFIG_ALIAS] alias.
//!
//! By default, the config is created with opinionated default values, which can then be overwritten
//! by environment variables prefixed with `KEYSTONE_` or `keystone.json` file.

use config::{Config, ConfigError, Environment, File};
use keystone_di::application::Application;
use keystone_di::error::ErrorPtr;
use keystone_di::instance::type_key;
use keystone_di::provider::ServiceProvider;
use keystone_di::ProviderMetadata;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const CONFIG_ENV_PREFIX: &str = "KEYSTONE";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "keystone.json";

/// Alias under which [ApplicationConfig] is available in the container.
pub const CONFIG_ALIAS: &str = "config";

/// Framework configuration.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed when the application boots.
    pub install_tracing_logger: bool,
    /// Filter directives for the default logger, used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Should a warning be logged for services declared by providers, which did not get bound.
    pub verify_provided_services: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            log_filter: "info".to_string(),
            verify_provided_services: true,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            log_filter: value.log_filter.unwrap_or(default.log_filter),
            verify_provided_services: value
                .verify_provided_services
                .unwrap_or(default.verify_provided_services),
        }
    }
}

impl ApplicationConfig {
    /// Loads the config from [CONFIG_FILE] (if present) and `KEYSTONE_` environment variables.
    pub fn init_from_environment() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(CONFIG_ENV_PREFIX))
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

/// Core provider making [ApplicationConfig] available in the container. Adopts a config which is
/// already registered (e.g. by [App](crate::application::App)), otherwise loads one from the
/// environment.
#[derive(ProviderMetadata, Default)]
#[provider(name = "config", providers = ["config"], core)]
pub struct ConfigServiceProvider;

impl ServiceProvider for ConfigServiceProvider {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        let key = type_key::<ApplicationConfig>();
        if !app.bound(&key) {
            debug!("No application config registered - loading from environment.");

            let config = ApplicationConfig::init_from_environment()
                .map_err(|error| Arc::new(error) as ErrorPtr)?;
            app.instance(&key, Arc::new(config));
        }

        app.alias(&key, CONFIG_ALIAS);
        Ok(())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    log_filter: Option<String>,
    verify_provided_services: Option<bool>,
}
