use keystone::application::App;
use keystone::config::{ApplicationConfig, CONFIG_ALIAS};
use keystone::loader::{ApplicationModuleLoader, ModuleLoader};
use keystone_di::application::Application;
use keystone_di::error::ErrorPtr;
use keystone_di::provider::{DeferredProviderPtr, DeferredServiceProvider, ServiceProvider};
use keystone_di::ProviderMetadata;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// deferred providers get an additional hook, which the application driver runs whenever it
// wants, e.g. after handling each request
#[derive(ProviderMetadata)]
#[provider(name = "metrics", requires = ["config"], providers = ["requests"])]
struct RequestCounterProvider;

impl ServiceProvider for RequestCounterProvider {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        app.container()
            .singleton("requests", |_| Ok(AtomicUsize::new(0)));
        Ok(())
    }
}

impl DeferredServiceProvider for RequestCounterProvider {
    fn deferred_boot(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        let requests = app
            .container()
            .make_typed::<AtomicUsize>("requests")
            .map_err(|error| Arc::new(error) as ErrorPtr)?;
        let config = app
            .container()
            .make_typed::<ApplicationConfig>(CONFIG_ALIAS)
            .map_err(|error| Arc::new(error) as ErrorPtr)?;

        println!(
            "handled {} requests (log filter: {})",
            requests.fetch_add(1, Ordering::SeqCst) + 1,
            config.log_filter
        );
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut app = App::default();
    let mut loader = ApplicationModuleLoader::new(&mut app);

    loader
        .load_module(Box::new(Arc::new(RequestCounterProvider) as DeferredProviderPtr) as Box<dyn Any>)
        .expect("error loading module");
    loader
        .bootstrap_application()
        .expect("error bootstrapping application");

    for _ in 0..3 {
        // prints "handled N requests (log filter: info)"
        app.run_deferred().expect("error running deferred boot");
    }
}
