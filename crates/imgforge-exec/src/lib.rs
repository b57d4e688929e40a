//! The Executor (spec §4.9): carries out a [`imgforge_plan::Plan`] by
//! invoking the external tool each task requires, in order, aborting the
//! build on the first failure and cleaning up partial output per the
//! configured delete-on-failure policy.

mod error;
mod executor;
mod options;

pub use error::{Error, Result};
pub use executor::Executor;
pub use options::ExecOptions;
