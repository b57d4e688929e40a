/// Knobs the Orchestrator supplies for the customize phase (spec §4.10).
///
/// Which binary launches the appliance and what disk format it's told to
/// expect are details of the concrete `GuestFs` backend a host binary
/// supplies, not of this crate — the guest-fs API is an external
/// collaborator this crate only has a contract with (spec §1), so those
/// knobs live on the backend, not here.
#[derive(Debug, Clone)]
pub struct CustomizeOptions {
    /// SELinux is disabled inside the appliance for the duration of the
    /// customize phase (spec §4.10); always true for this tool's builds.
    pub disable_selinux: bool,
    /// `fsync` the output file before returning, when the user passed
    /// `--sync`.
    pub sync: bool,
}

impl Default for CustomizeOptions {
    fn default() -> Self {
        Self {
            disable_selinux: true,
            sync: false,
        }
    }
}
