//! The top-level error kinds this tool surfaces to its host (spec §7),
//! aggregating each crate's own typed error into the closed kind list the
//! Orchestrator prints a single line for before exiting non-zero.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("repository index is corrupt: {0}")]
    CorruptIndex(#[from] imgforge_index::Error),

    #[error("trust verification failed: {0}")]
    TrustFailure(#[from] imgforge_verify::TrustError),

    #[error("download failed: {0}")]
    FetchError(#[from] imgforge_fetch::Error),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("planner could not find a plan: {0}")]
    NoPlan(#[from] imgforge_plan::Error),

    #[error("build step failed: {0}")]
    ExecError(#[from] imgforge_exec::Error),

    #[error("guest customization failed: {0}")]
    CustomizeError(#[from] imgforge_customize::Error),

    #[error("source configuration error: {0}")]
    SourceError(#[from] imgforge_source::Error),

    #[error("pxzcat failed: {0}")]
    Pxzcat(#[from] imgforge_pxzcat::Error),

    #[error("no template named '{0}' was found in any configured repository")]
    TemplateNotFound(String),

    #[error("'{0}' has no usable base directory for a cache; caching is disabled")]
    NoCacheDir(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// The process exit code this error kind maps to. Every variant is
    /// non-zero; kept as one mapping rather than scattered `process::exit`
    /// calls (spec §7).
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Config(_) | BuildError::SourceError(_) => 2,
            BuildError::CorruptIndex(_) => 3,
            BuildError::TrustFailure(_) => 4,
            BuildError::FetchError(_) => 5,
            BuildError::CacheError(_) | BuildError::NoCacheDir(_) => 6,
            BuildError::NoPlan(_) => 7,
            BuildError::ExecError(_) | BuildError::Pxzcat(_) => 8,
            BuildError::CustomizeError(_) => 9,
            BuildError::TemplateNotFound(_) => 10,
            BuildError::Io(_) | BuildError::Url(_) => 1,
        }
    }
}
