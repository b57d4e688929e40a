//! The Fetcher and Cache (spec §4.1, §4.2): downloading a URI via a
//! configurable external transfer tool with atomic placement, and the
//! content-addressable on-disk template cache that downloads land in.
//!
//! # Architecture
//!
//! - `cache` - [`Cache`], keyed by `(name, arch, revision)`
//! - `fetch` - [`Fetcher`], the sibling-rename download protocol
//! - `progress` - structured progress reporting during a download
//! - `error` - shared error type

mod cache;
mod error;
mod fetch;
mod progress;

pub use cache::{Cache, CacheListItem};
pub use error::{Error, Result};
pub use fetch::{Fetcher, TemplateKey};
pub use progress::{Phase, Progress, ProgressFn};
