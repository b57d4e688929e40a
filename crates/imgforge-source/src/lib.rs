//! Source configuration: `repos.d` descriptor parsing and the XDG-scanned
//! registry that assembles them with CLI-supplied sources (spec §4.6).

mod descriptor;
mod error;
mod registry;

pub use descriptor::parse_descriptor;
pub use error::{Error, Result};
pub use registry::SourceRegistry;
