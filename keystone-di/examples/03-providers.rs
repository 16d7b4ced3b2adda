use keystone_di::application::Application;
use keystone_di::container::Container;
use keystone_di::error::ErrorPtr;
use keystone_di::provider::ServiceProvider;
use keystone_di::provider_registry::ProviderRegistry;
use keystone_di::ProviderMetadata;
use std::sync::Arc;

// providers register groups of related services; this one needs "storage" to be registered first
#[derive(ProviderMetadata)]
#[provider(name = "reports", requires = ["storage"], providers = ["reports"])]
struct ReportsProvider;

impl ServiceProvider for ReportsProvider {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        app.container().singleton("reports", |container| {
            let storage = container.make_typed::<String>("storage")?;
            Ok(format!("reports stored in {storage}"))
        });
        Ok(())
    }

    // boot runs after all providers registered their services
    fn boot(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        let reports = app
            .container()
            .make_typed::<String>("reports")
            .map_err(|error| Arc::new(error) as ErrorPtr)?;
        println!("{reports}");
        Ok(())
    }
}

#[derive(ProviderMetadata)]
#[provider(name = "storage", providers = ["storage"])]
struct StorageProvider;

impl ServiceProvider for StorageProvider {
    fn register(&self, app: &dyn Application) -> Result<(), ErrorPtr> {
        app.container().bind("storage", |_| Ok("/var/data".to_string()));
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let container = Container::new();
    let mut registry = ProviderRegistry::new();
    registry
        .add(Arc::new(ReportsProvider))
        .expect("error adding provider");
    registry
        .add(Arc::new(StorageProvider))
        .expect("error adding provider");

    // prints ["storage", "reports"]
    println!(
        "{:?}",
        registry.activation_order().expect("error ordering providers")
    );

    // prints "reports stored in /var/data"
    registry
        .activate(&container)
        .expect("error activating providers");
}
