use keystone_di::container::Container;
use keystone_di::instance::into_instance;
use keystone_di::invoker::Callback;
use std::sync::Arc;

struct Config {
    greeting: String,
}

struct User {
    name: String,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let container = Container::new();
    container.instance_typed(Config {
        greeting: "Hello".to_string(),
    });

    // parameters are resolved by their type, unless an extra argument of the same type is passed
    let outputs = container
        .call(
            |config: Arc<Config>, user: Arc<User>| format!("{} {}!", config.greeting, user.name),
            vec![into_instance(User {
                name: "World".to_string(),
            })],
        )
        .expect("error calling function");

    // prints "Hello World!"
    println!("{}", outputs[0].downcast_ref::<String>().expect("unexpected output"));

    // callbacks can also be stored in the container and called later
    container.instance(
        "shout",
        into_instance(Callback::new(|config: Arc<Config>| {
            config.greeting.to_uppercase()
        })),
    );

    let shout = container.must_make("shout");
    let outputs = container
        .call_instance(&shout, vec![])
        .expect("error calling callback");

    // prints "HELLO"
    println!("{}", outputs[0].downcast_ref::<String>().expect("unexpected output"));
}
