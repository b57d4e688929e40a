use std::sync::Mutex;

use once_cell::sync::Lazy;

type Cleanup = Box<dyn FnOnce() + Send + 'static>;

static REGISTRY: Lazy<Mutex<Vec<Cleanup>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Register a closure to run once when [`run_cleanups`] is called. Used for
/// partial output files, scoped keyrings, and planner temporaries so they are
/// removed on SIGINT/SIGTERM as well as on a clean return.
pub fn register_cleanup<F: FnOnce() + Send + 'static>(f: F) {
    if let Ok(mut registry) = REGISTRY.lock() {
        registry.push(Box::new(f));
    }
}

/// Run and drop every registered cleanup, in reverse registration order
/// (most recently registered resource is torn down first). Idempotent: a
/// second call runs an empty list.
pub fn run_cleanups() {
    let cleanups = REGISTRY.lock().map(|mut r| std::mem::take(&mut *r)).unwrap_or_default();
    for cleanup in cleanups.into_iter().rev() {
        cleanup();
    }
}
