use keystone_di::container::Container;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

struct Connection {
    id: usize,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let created = Arc::new(AtomicUsize::new(0));
    let container = Arc::new(Container::new());

    // singleton factories run at most once, even when resolved concurrently
    {
        let created = created.clone();
        container.singleton_typed(move |_| {
            Ok(Connection {
                id: created.fetch_add(1, Ordering::SeqCst),
            })
        });
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || {
                container
                    .resolve::<Connection>()
                    .expect("error resolving connection")
                    .id
            })
        })
        .collect();

    for handle in handles {
        // prints "connection 0" four times
        println!("connection {}", handle.join().expect("thread panicked"));
    }

    // prints "created 1"
    println!("created {}", created.load(Ordering::SeqCst));
}
