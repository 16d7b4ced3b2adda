use keystone::application::App;
use keystone::loader::{ApplicationModuleLoader, ModuleLoader};
use keystone_di::application::Application;
use keystone_di::error::ErrorPtr;
use keystone_di::provider::{ProviderPtr, ServiceProvider};
use keystone_di::ProviderMetadata;
use std::any::Any;
use std::sync::Arc;
use tracing::info;

// this is a module of our application, which registers a greeting service
#[derive(ProviderMetadata)]
#[provider(providers = ["greeting"])]
struct GreetingProvider;

impl ServiceProvider for GreetingProvider {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        app.container()
            .bind("greeting", |_| Ok("Hello world!".to_string()));
        Ok(())
    }

    fn boot(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        let greeting = app
            .container()
            .make_typed::<String>("greeting")
            .map_err(|error| Arc::new(error) as ErrorPtr)?;
        info!("{greeting}");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // config is read from keystone.json and KEYSTONE_ environment variables
    let mut app = App::from_environment().expect("error loading configuration");
    let mut loader = ApplicationModuleLoader::new(&mut app);

    loader
        .load_modules(vec![
            Box::new(Arc::new(GreetingProvider) as ProviderPtr) as Box<dyn Any>
        ])
        .expect("error loading modules");

    // logs "Hello world!"
    loader
        .bootstrap_application()
        .expect("error bootstrapping application");
}
