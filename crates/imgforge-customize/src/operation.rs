use std::path::PathBuf;

/// How `SetRootPassword` should set the account's password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootPassword {
    Plain(String),
    /// Generate a random password and report it back to the caller.
    Random,
    /// Lock the account (`passwd -l`-equivalent).
    Locked,
}

/// One customization the user requested, in the order given on the command
/// line (spec §4.10 orders operations across kinds, not just within one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomizeOp {
    WriteFile { path: String, content: Vec<u8> },
    /// Upload a local file into the guest, carrying over its permission
    /// bits (spec §4.10 "uploads with permission carry-over").
    Upload { local: PathBuf, remote: String },
    /// A scripted in-place edit: `sed_script` is passed to `sed -i` run
    /// inside the guest.
    Edit { path: String, sed_script: String },
    Delete { path: String },
    /// Overwrite a file's content with zeros before deleting it.
    Scrub { path: String },
    /// Install `script` so it runs once at the guest's next boot. The
    /// installation mechanics (init-system detection, unit authoring) are
    /// an external collaborator's concern (spec §1 non-goals); this op
    /// only carries the script text through to that collaborator.
    FirstbootScript { script: String },
    /// Upload `script` and execute it inside the mounted guest
    /// immediately (as opposed to at firstboot).
    RunScript { script: PathBuf },
    Mkdir { path: String },
    /// Package names to install via the guest's native package manager.
    /// The package-manager dispatch itself is an external collaborator's
    /// concern (spec §1 non-goals).
    InstallPackages { packages: Vec<String> },
    SetRootPassword { password: RootPassword },
}

impl std::fmt::Display for CustomizeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomizeOp::WriteFile { path, .. } => write!(f, "write {path}"),
            CustomizeOp::Upload { remote, .. } => write!(f, "upload -> {remote}"),
            CustomizeOp::Edit { path, .. } => write!(f, "edit {path}"),
            CustomizeOp::Delete { path } => write!(f, "delete {path}"),
            CustomizeOp::Scrub { path } => write!(f, "scrub {path}"),
            CustomizeOp::FirstbootScript { .. } => write!(f, "firstboot script"),
            CustomizeOp::RunScript { script } => write!(f, "run script {}", script.display()),
            CustomizeOp::Mkdir { path } => write!(f, "mkdir {path}"),
            CustomizeOp::InstallPackages { packages } => write!(f, "install {}", packages.join(" ")),
            CustomizeOp::SetRootPassword { .. } => write!(f, "set root password"),
        }
    }
}
