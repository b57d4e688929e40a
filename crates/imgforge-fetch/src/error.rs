use std::path::PathBuf;

/// Failures the Fetcher and Cache surface (spec §7: `FetchError`/`CacheError`).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not parse transfer tool status output for '{uri}': {reason}")]
    StatusParse { uri: String, reason: String },

    #[error("'{uri}' returned status {status}")]
    BadStatus { uri: String, status: u16 },

    #[error("'{uri}' returned an empty response body")]
    EmptyResponse { uri: String },

    #[error("transfer tool failed: {0}")]
    Transfer(#[from] imgforge_platform::Error),

    #[error("trust verification failed: {0}")]
    TrustFailure(#[from] imgforge_verify::TrustError),

    #[error("failed to create cache directory '{path}': {source}")]
    CacheDirCreate { path: PathBuf, source: std::io::Error },

    #[error(transparent)]
    Fs(#[from] imgforge_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("URI '{0}' cannot be turned into a local path")]
    NotALocalPath(String),
}

pub type Result<T> = std::result::Result<T, Error>;
