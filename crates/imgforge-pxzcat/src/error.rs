use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("'{path}' does not start with the xz stream magic")]
    BadMagic { path: PathBuf },

    #[error("malformed xz stream footer: {reason}")]
    BadFooter { reason: String },

    #[error("malformed xz stream index: {reason}")]
    BadIndex { reason: String },

    #[error("malformed xz block header at offset {offset}: {reason}")]
    BadBlockHeader { offset: u64, reason: String },

    #[error("block at offset {offset} failed to decode: {reason}")]
    BlockDecode { offset: u64, reason: String },

    #[error("worker thread panicked while decoding block at offset {offset}")]
    WorkerPanicked { offset: u64 },

    #[error(transparent)]
    Fs(#[from] imgforge_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ExternalTool(#[from] imgforge_platform::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
