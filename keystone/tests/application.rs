use keystone::application::{App, ApplicationError};
use keystone::config::{ApplicationConfig, CONFIG_ALIAS};
use keystone::loader::{ApplicationModuleLoader, ModuleLoader};
use keystone_di::application::Application;
use keystone_di::error::{DeferredBootError, ErrorPtr};
use keystone_di::provider::{
    DeferredProviderPtr, DeferredServiceProvider, ProviderPtr, ServiceProvider,
};
use keystone_di::ProviderMetadata;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("cache flush failed")]
struct FlushError;

struct Cache {
    entries: Mutex<Vec<String>>,
}

#[derive(ProviderMetadata)]
#[provider(requires = ["config"], providers = ["cache"])]
struct CacheProvider;

impl ServiceProvider for CacheProvider {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        app.container().singleton("cache", |container| {
            let config = container.make_typed::<ApplicationConfig>(CONFIG_ALIAS)?;
            Ok(Cache {
                entries: Mutex::new(vec![config.log_filter.clone()]),
            })
        });
        Ok(())
    }
}

#[derive(ProviderMetadata)]
#[provider(requires = ["cache_provider"])]
struct WarmupProvider {
    fail: bool,
}

impl ServiceProvider for WarmupProvider {
    fn register(&self, _app: &dyn Application) -> Result<(), ErrorPtr> {
        Ok(())
    }

    fn boot(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        let cache = app.make("cache").map_err(|error| Arc::new(error) as ErrorPtr)?;
        if let Some(cache) = cache.downcast_ref::<Cache>() {
            cache.entries.lock().push("warm".to_string());
        }
        Ok(())
    }
}

impl DeferredServiceProvider for WarmupProvider {
    fn deferred_boot(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        if self.fail {
            return Err(Arc::new(FlushError));
        }

        if let Some(cache) = app.must_make("cache").downcast_ref::<Cache>() {
            cache.entries.lock().clear();
        }
        Ok(())
    }
}

fn test_app() -> App {
    let mut config = ApplicationConfig::default();
    config.install_tracing_logger = false;
    config.log_filter = "debug".to_string();
    App::new(config)
}

fn modules(fail_deferred: bool) -> Vec<Box<dyn Any>> {
    vec![
        Box::new(Arc::new(WarmupProvider {
            fail: fail_deferred,
        }) as DeferredProviderPtr) as Box<dyn Any>,
        Box::new(Arc::new(CacheProvider) as ProviderPtr) as Box<dyn Any>,
    ]
}

fn cache_entries(app: &App) -> Vec<String> {
    app.container()
        .make_typed::<Cache>("cache")
        .map(|cache| cache.entries.lock().clone())
        .unwrap_or_default()
}

#[test]
fn should_bootstrap_loaded_modules() {
    let mut app = test_app();
    let mut loader = ApplicationModuleLoader::new(&mut app);
    loader.load_modules(modules(false)).unwrap();
    loader.bootstrap_application().unwrap();

    assert!(app.is_booted());
    assert_eq!(cache_entries(&app), ["debug", "warm"]);

    app.run_deferred().unwrap();
    assert!(cache_entries(&app).is_empty());
}

#[test]
fn should_report_failed_deferred_boot() {
    let mut app = test_app();
    let mut loader = ApplicationModuleLoader::new(&mut app);
    loader.load_modules(modules(true)).unwrap();
    loader.bootstrap_application().unwrap();

    assert!(matches!(
        app.run_deferred().unwrap_err(),
        ApplicationError::DeferredBoot(DeferredBootError::Failed(failures))
            if failures.len() == 1 && failures[0].provider == "warmup_provider"
    ));
    assert!(app.is_booted());
}

#[test]
fn should_not_boot_without_core_providers() {
    let mut app = test_app();
    ApplicationModuleLoader::new(&mut app)
        .load_modules(modules(false))
        .unwrap();

    assert!(app.boot().is_err());
    assert!(!app.is_booted());
}
