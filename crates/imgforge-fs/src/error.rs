use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create '{path}': {source}")]
    Create { path: PathBuf, source: std::io::Error },

    #[error("failed to rename '{from}' to '{to}': {source}")]
    Rename { from: PathBuf, to: PathBuf, source: std::io::Error },

    #[error("failed to remove '{path}': {source}")]
    Remove { path: PathBuf, source: std::io::Error },

    #[error("positional write at offset {offset} failed: {source}")]
    PositionalWrite { offset: u64, source: std::io::Error },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
