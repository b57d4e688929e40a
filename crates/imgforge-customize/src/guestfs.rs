//! The guest-fs API (spec §1): mount, write, chmod, chown, inspect. This
//! crate treats it as an external collaborator with a contract only — no
//! concrete mount/write backend ships here; [`GuestFs`] is the boundary a
//! host binary implements against a real guest-manipulation library.

use std::path::Path;

use crate::error::Result;

/// One mountpoint discovered by inspection, ordered (by the caller) so
/// shorter paths mount before the filesystems nested under them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mountpoint {
    pub device: String,
    pub path: String,
}

/// The guest-fs operations the Customizer needs. A real implementation
/// launches one appliance, applies the batch, and tears it down
/// afterward; tests substitute a recording fake.
pub trait GuestFs {
    fn inspect_roots(&mut self) -> Result<Vec<String>>;
    fn inspect_mountpoints(&mut self, root: &str) -> Result<Vec<Mountpoint>>;

    /// Run every staged operation against the mounted guest in one batch:
    /// mount each of `mounts` (already caller-ordered), disable SELinux
    /// when requested, execute `commands` in order, then unmount
    /// everything.
    fn apply(&mut self, mounts: &[Mountpoint], disable_selinux: bool, commands: &[GuestFsCommand]) -> Result<()>;
}

/// One primitive guest-fs call, the vocabulary [`crate::customizer::Customizer`]
/// lowers [`crate::operation::CustomizeOp`] into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestFsCommand {
    Write { path: String, content: Vec<u8> },
    Upload { local: std::path::PathBuf, remote: String, mode: Option<u32> },
    Sh { script: String },
    Rm { path: String },
    ScrubFile { path: String },
    MkdirP { path: String },
}

/// Sort mountpoints by increasing path length, so parents mount before the
/// filesystems nested under them (spec §4.10).
pub fn order_by_mount_length(mut mounts: Vec<Mountpoint>) -> Vec<Mountpoint> {
    mounts.sort_by_key(|m| m.path.len());
    mounts
}

/// The local file's permission bits, carried over on upload (spec §4.10
/// "uploads with permission carry-over").
pub fn local_file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::metadata(path)?;
    Ok(meta.permissions().mode() & 0o7777)
}
