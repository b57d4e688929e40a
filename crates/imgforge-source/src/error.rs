use std::path::PathBuf;

use thiserror::Error;

/// Failures while scanning or parsing source descriptors (spec §4.6).
#[derive(Debug, Error)]
pub enum Error {
    #[error("{path}: section [{section}] is missing required key `uri`")]
    MissingUri { path: PathBuf, section: String },

    #[error("{path}: section [{section}] has an unparsable `uri`: {value}")]
    BadUri {
        path: PathBuf,
        section: String,
        value: String,
    },

    #[error(
        "--fingerprint was given {given} time(s) but {sources} --source value(s) were given; \
         supply either one fingerprint for all sources or exactly one per source"
    )]
    FingerprintCountMismatch { given: usize, sources: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
