use keystone_di::container::Container;

struct Database {
    url: String,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let container = Container::new();

    // bindings are factories run on every resolution
    container.bind("database.url", |_| Ok("postgres://localhost".to_string()));

    // factories can resolve other services
    container.bind("database", |container| {
        let url = container.make_typed::<String>("database.url")?;
        Ok(Database {
            url: url.to_string(),
        })
    });

    // aliases point at other keys
    container.alias("database", "db");

    let database = container
        .make_typed::<Database>("db")
        .expect("error resolving database");

    // prints "postgres://localhost"
    println!("{}", database.url);
}
