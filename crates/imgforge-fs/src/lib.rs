//! Atomic filesystem primitives shared by the cache, trust chain, and
//! decompressor.
//!
//! # Architecture
//!
//! - `error` - shared error type
//! - `atomic` - sibling-rename write/rename helpers
//! - `sparse` - sparse-file creation and positional writes
//! - `scoped` - scoped directories that are guaranteed to be removed
//! - `exit` - a process-wide registry of cleanup closures, run once on
//!   normal exit or signal

mod atomic;
mod error;
mod exit;
mod scoped;
mod sparse;

pub use atomic::{atomic_rename, random_suffix, sibling_path};
pub use error::{Error, Result};
pub use exit::{register_cleanup, run_cleanups};
pub use scoped::ScopedDir;
pub use sparse::{create_sparse_file, pwrite};
