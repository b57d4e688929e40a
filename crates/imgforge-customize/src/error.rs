use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A guest-fs API call failed (spec §7 CustomizeError); usually fatal
    /// to the build. The host binary's [`crate::GuestFs`] implementation
    /// supplies its own error detail as the boxed source.
    #[error("guest-fs operation '{operation}' failed: {source}")]
    GuestFsOperation {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("image has no root filesystem to customize")]
    NoRootFilesystem,

    #[error("image has {count} root filesystems; multi-boot images are not supported")]
    MultipleRootFilesystems { count: usize },

    #[error("inspection produced an unparsable root device line: {line:?}")]
    UnparsableInspection { line: String },

    #[error("--install was requested but no package installer was configured")]
    MissingPackageInstaller,

    #[error("a firstboot script was requested but no firstboot installer was configured")]
    MissingFirstbootInstaller,

    #[error("could not stage local file {path} for upload: {source}")]
    StageUpload { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Fs(#[from] imgforge_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
