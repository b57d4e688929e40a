//! Orchestrates the mount-and-modify phase (spec §4.10): inspect the image
//! for a single root filesystem, mount every filesystem by increasing
//! mount-point length, apply the user's customizations in their original
//! order, then unmount and optionally `fsync` the output.

use std::path::Path;

use tracing::{info, instrument, warn};

use crate::collaborators::{FirstbootInstaller, PackageInstaller};
use crate::error::{Error, Result};
use crate::guestfs::{self, GuestFs, GuestFsCommand};
use crate::operation::{CustomizeOp, RootPassword};
use crate::options::CustomizeOptions;

pub struct Customizer<'a> {
    options: CustomizeOptions,
    package_installer: Option<&'a dyn PackageInstaller>,
    firstboot_installer: Option<&'a dyn FirstbootInstaller>,
}

impl<'a> Customizer<'a> {
    pub fn new(options: CustomizeOptions) -> Self {
        Self { options, package_installer: None, firstboot_installer: None }
    }

    pub fn with_package_installer(mut self, installer: &'a dyn PackageInstaller) -> Self {
        self.package_installer = Some(installer);
        self
    }

    pub fn with_firstboot_installer(mut self, installer: &'a dyn FirstbootInstaller) -> Self {
        self.firstboot_installer = Some(installer);
        self
    }

    /// Apply every op in `ops`, in order, to the image mounted through
    /// `guest`. `image_path` is only needed for the trailing `--sync`.
    #[instrument(skip(self, guest, ops), fields(ops = ops.len()))]
    pub fn run(&self, guest: &mut dyn GuestFs, image_path: &Path, ops: &[CustomizeOp]) -> Result<()> {
        let roots = guest.inspect_roots()?;
        let root = match roots.len() {
            0 => return Err(Error::NoRootFilesystem),
            1 => &roots[0],
            count => return Err(Error::MultipleRootFilesystems { count }),
        };
        info!(root, "resolved single root filesystem");

        let mounts = guestfs::order_by_mount_length(guest.inspect_mountpoints(root)?);

        let mut commands = Vec::with_capacity(ops.len());
        for op in ops {
            self.lower(op, &mut commands)?;
        }

        guest.apply(&mounts, self.options.disable_selinux, &commands)?;

        if self.options.sync {
            sync_file(image_path)?;
        }
        Ok(())
    }

    fn lower(&self, op: &CustomizeOp, out: &mut Vec<GuestFsCommand>) -> Result<()> {
        match op {
            CustomizeOp::WriteFile { path, content } => {
                out.push(GuestFsCommand::Write { path: path.clone(), content: content.clone() });
            }
            CustomizeOp::Upload { local, remote } => {
                let mode = guestfs::local_file_mode(local).ok();
                out.push(GuestFsCommand::Upload { local: local.clone(), remote: remote.clone(), mode });
            }
            CustomizeOp::Edit { path, sed_script } => {
                out.push(GuestFsCommand::Sh { script: format!("sed -i {} {}", shell_quote(sed_script), path) });
            }
            CustomizeOp::Delete { path } => {
                out.push(GuestFsCommand::Rm { path: path.clone() });
            }
            CustomizeOp::Scrub { path } => {
                out.push(GuestFsCommand::ScrubFile { path: path.clone() });
            }
            CustomizeOp::FirstbootScript { script } => {
                let installer = self.firstboot_installer.ok_or(Error::MissingFirstbootInstaller)?;
                out.extend(installer.commands(script));
            }
            CustomizeOp::RunScript { script } => {
                let remote = "/tmp/imgforge-run-script";
                let mode = guestfs::local_file_mode(script).ok();
                out.push(GuestFsCommand::Upload { local: script.clone(), remote: remote.to_string(), mode: mode.or(Some(0o755)) });
                out.push(GuestFsCommand::Sh { script: format!("sh {remote}") });
                out.push(GuestFsCommand::Rm { path: remote.to_string() });
            }
            CustomizeOp::Mkdir { path } => {
                out.push(GuestFsCommand::MkdirP { path: path.clone() });
            }
            CustomizeOp::InstallPackages { packages } => {
                let installer = self.package_installer.ok_or(Error::MissingPackageInstaller)?;
                out.extend(installer.commands(packages));
            }
            CustomizeOp::SetRootPassword { password } => {
                out.push(GuestFsCommand::Sh { script: root_password_script(password) });
            }
        }
        Ok(())
    }
}

fn root_password_script(password: &RootPassword) -> String {
    match password {
        RootPassword::Plain(value) => format!("echo root:{} | chpasswd", shell_quote(value)),
        RootPassword::Random => "cat /dev/urandom | tr -dc 'A-Za-z0-9' | head -c16 | (read p; echo \"root:$p\" | chpasswd)".to_string(),
        RootPassword::Locked => "passwd -l root".to_string(),
    }
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn sync_file(path: &Path) -> Result<()> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guestfs::Mountpoint;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeGuestFs {
        roots: Vec<String>,
        mountpoints: Vec<Mountpoint>,
        applied: RefCell<Vec<(Vec<Mountpoint>, bool, Vec<GuestFsCommand>)>>,
    }

    impl GuestFs for FakeGuestFs {
        fn inspect_roots(&mut self) -> Result<Vec<String>> { Ok(self.roots.clone()) }
        fn inspect_mountpoints(&mut self, _root: &str) -> Result<Vec<Mountpoint>> { Ok(self.mountpoints.clone()) }
        fn apply(&mut self, mounts: &[Mountpoint], selinux: bool, commands: &[GuestFsCommand]) -> Result<()> {
            self.applied.borrow_mut().push((mounts.to_vec(), selinux, commands.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn rejects_no_root_filesystem() {
        let mut guest = FakeGuestFs::default();
        let customizer = Customizer::new(CustomizeOptions::default());
        let err = customizer.run(&mut guest, Path::new("/tmp/x"), &[]).unwrap_err();
        assert!(matches!(err, Error::NoRootFilesystem));
    }

    #[test]
    fn rejects_multiple_root_filesystems() {
        let mut guest = FakeGuestFs { roots: vec!["/dev/sda1".into(), "/dev/sdb1".into()], ..Default::default() };
        let customizer = Customizer::new(CustomizeOptions::default());
        let err = customizer.run(&mut guest, Path::new("/tmp/x"), &[]).unwrap_err();
        assert!(matches!(err, Error::MultipleRootFilesystems { count: 2 }));
    }

    #[test]
    fn applies_ops_in_order_and_mounts_are_passed_through() {
        let mut guest = FakeGuestFs {
            roots: vec!["/dev/sda1".into()],
            mountpoints: vec![
                Mountpoint { device: "/dev/sda2".into(), path: "/boot".into() },
                Mountpoint { device: "/dev/sda1".into(), path: "/".into() },
            ],
            ..Default::default()
        };
        let customizer = Customizer::new(CustomizeOptions::default());
        let ops = vec![
            CustomizeOp::Mkdir { path: "/etc/imgforge".to_string() },
            CustomizeOp::WriteFile { path: "/etc/imgforge/marker".to_string(), content: b"hi".to_vec() },
            CustomizeOp::Delete { path: "/etc/hostname".to_string() },
        ];
        customizer.run(&mut guest, Path::new("/tmp/x"), &ops).unwrap();

        let applied = guest.applied.borrow();
        assert_eq!(applied.len(), 1);
        let (mounts, selinux, commands) = &applied[0];
        assert_eq!(mounts[0].path, "/");
        assert_eq!(mounts[1].path, "/boot");
        assert!(selinux);
        assert_eq!(commands.len(), 3);
        assert!(matches!(&commands[0], GuestFsCommand::MkdirP { path } if path == "/etc/imgforge"));
        assert!(matches!(&commands[2], GuestFsCommand::Rm { path } if path == "/etc/hostname"));
    }

    #[test]
    fn install_packages_without_an_installer_is_an_error() {
        let mut guest = FakeGuestFs { roots: vec!["/dev/sda1".into()], ..Default::default() };
        let customizer = Customizer::new(CustomizeOptions::default());
        let ops = vec![CustomizeOp::InstallPackages { packages: vec!["htop".to_string()] }];
        let err = customizer.run(&mut guest, Path::new("/tmp/x"), &ops).unwrap_err();
        assert!(matches!(err, Error::MissingPackageInstaller));
    }

    struct FakePackageInstaller;
    impl PackageInstaller for FakePackageInstaller {
        fn commands(&self, packages: &[String]) -> Vec<GuestFsCommand> {
            vec![GuestFsCommand::Sh { script: format!("install {}", packages.join(",")) }]
        }
    }

    #[test]
    fn install_packages_delegates_to_the_configured_installer() {
        let mut guest = FakeGuestFs { roots: vec!["/dev/sda1".into()], ..Default::default() };
        let installer = FakePackageInstaller;
        let customizer = Customizer::new(CustomizeOptions::default()).with_package_installer(&installer);
        let ops = vec![CustomizeOp::InstallPackages { packages: vec!["htop".to_string()] }];
        customizer.run(&mut guest, Path::new("/tmp/x"), &ops).unwrap();

        let applied = guest.applied.borrow();
        assert!(matches!(&applied[0].2[0], GuestFsCommand::Sh { script } if script == "install htop"));
    }
}
