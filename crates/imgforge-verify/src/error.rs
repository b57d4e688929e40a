use std::path::PathBuf;

/// Every failure this crate can produce collapses to a single, unambiguous
/// "trust failed" condition at the orchestrator boundary; the variants below
/// exist so the human-readable cause can be specific.
#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("checksum mismatch ({kind}): expected {expected}, got {actual}")]
    ChecksumMismatch { kind: &'static str, expected: String, actual: String },

    #[error("signature verification failed for '{file}': {reason}")]
    SignatureInvalid { file: PathBuf, reason: String },

    #[error("fingerprint mismatch: configured {configured}, signature carried {actual}")]
    FingerprintMismatch { configured: String, actual: String },

    #[error("detached signature required but not provided for '{file}'")]
    MissingDetachedSignature { file: PathBuf },

    #[error("gpg tool failed: {0}")]
    Gpg(#[from] imgforge_platform::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TrustError>;
