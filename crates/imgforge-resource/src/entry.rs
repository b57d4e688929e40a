use std::sync::Arc;

use imgforge_platform::ProxyPolicy;
use imgforge_verify::{Checksum, TrustChain};
use url::Url;

use crate::arch::Arch;
use crate::revision::Revision;

/// A single `(language, note-text)` pair from an index entry's `notes` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub lang: Option<String>,
    pub text: String,
}

/// One template advertised by a repository index, keyed externally by
/// `(os-version, arch)` (spec §3).
#[derive(Clone)]
pub struct IndexEntry {
    pub os_version: String,
    pub display_name: Option<String>,
    pub osinfo_short_id: Option<String>,
    pub file_uri: Url,
    pub arch: Arch,
    pub signature_uri: Option<Url>,
    pub checksums: Vec<Checksum>,
    pub revision: Revision,
    pub format: Option<String>,
    pub size: u64,
    pub compressed_size: Option<u64>,
    pub expand: Option<String>,
    pub lv_expand: Option<String>,
    pub notes: Vec<Note>,
    pub hidden: bool,
    pub aliases: Vec<String>,
    pub trust: Arc<TrustChain>,
    pub proxy: ProxyPolicy,
}

impl IndexEntry {
    /// The `(name, arch)` key used for deduplication (spec §3 invariant I2).
    pub fn dedup_key(&self) -> (String, String) {
        (self.os_version.clone(), self.arch.as_str().to_string())
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.os_version == name || self.aliases.iter().any(|a| a == name)
    }
}

impl std::fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexEntry")
            .field("os_version", &self.os_version)
            .field("arch", &self.arch)
            .field("revision", &self.revision)
            .field("file_uri", &self.file_uri.as_str())
            .field("size", &self.size)
            .field("hidden", &self.hidden)
            .field("aliases", &self.aliases)
            .finish()
    }
}
