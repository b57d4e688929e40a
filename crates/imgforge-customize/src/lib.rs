//! The Customizer (spec §4.10): orchestrates the mount-and-modify phase
//! over the guest-fs API, an external capability this crate treats as a
//! collaborator with a contract ([`GuestFs`]) rather than an
//! implementation detail.
//!
//! # Architecture
//!
//! - `operation` - the ordered customization vocabulary the CLI layer
//!   builds from user flags
//! - `guestfs` - the [`GuestFs`] contract and its supporting types; no
//!   concrete backend ships in this crate
//! - `collaborators` - contracts for the two explicitly out-of-scope
//!   behaviors (package-manager dispatch, firstboot installation)
//! - `customizer` - [`Customizer`], which ties the above together in the
//!   order spec §4.10 requires

mod collaborators;
mod customizer;
mod error;
mod guestfs;
mod operation;
mod options;

pub use collaborators::{FirstbootInstaller, PackageInstaller};
pub use customizer::Customizer;
pub use error::{Error, Result};
pub use guestfs::{GuestFs, GuestFsCommand, Mountpoint};
pub use operation::{CustomizeOp, RootPassword};
pub use options::CustomizeOptions;
