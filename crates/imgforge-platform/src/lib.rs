//! Cross-platform directory resolution, proxy environment policy, and
//! external process execution.

pub mod command;
pub mod dirs;
pub mod error;
pub mod proxy;

pub use command::Command;
pub use error::{Error, Result};
pub use proxy::ProxyPolicy;
