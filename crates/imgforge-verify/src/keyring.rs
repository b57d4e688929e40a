use std::path::PathBuf;

/// The trust anchor a repository source declares, per spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyDescriptor {
    NoKey,
    Fingerprint(String),
    KeyFile(PathBuf),
}

impl Default for KeyDescriptor {
    fn default() -> Self { KeyDescriptor::NoKey }
}
