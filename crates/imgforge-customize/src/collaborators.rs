//! Contracts for the two pieces of customize-time behavior this
//! specification deliberately keeps out of scope (spec §1): the
//! shell-style package-manager dispatch for `--install`, and
//! firstboot-script installation. Each collaborator only translates a
//! request into guest-fs commands the Customizer splices into its batch at
//! the right position; neither runs anything itself, so the Customizer
//! keeps sole ownership of ordering and of the single guest-fs session.

use crate::guestfs::GuestFsCommand;

/// Dispatches `--install <packages>` to whatever native package manager the
/// guest uses. An external collaborator's concern; this crate defines only
/// the contract it's invoked through.
pub trait PackageInstaller {
    fn commands(&self, packages: &[String]) -> Vec<GuestFsCommand>;
}

/// Installs a script so it runs once at the guest's next boot. The
/// init-system detection and unit/service authoring are an external
/// collaborator's concern; this crate only carries the script text to it.
pub trait FirstbootInstaller {
    fn commands(&self, script: &str) -> Vec<GuestFsCommand>;
}
