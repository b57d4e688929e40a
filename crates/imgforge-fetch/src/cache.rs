use std::path::{Path, PathBuf};

use tabled::{Table, Tabled};
use tracing::debug;

use crate::error::{Error, Result};

/// Content-addressable on-disk cache keyed by `(template-name, arch,
/// revision)` (spec §4.2). `is_cached` only checks file existence; the
/// trust chain is what makes a canonical file trustworthy, and that check
/// happens once, on download.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `mkdir -p` the cache directory with mode 0755.
    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::CacheDirCreate {
            path: self.dir.clone(),
            source: e,
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o755);
            let _ = std::fs::set_permissions(&self.dir, perms);
        }
        Ok(())
    }

    /// Recursively remove and recreate the cache directory.
    pub fn clean(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        self.create()
    }

    /// `<cachedir>/<name>.<arch>.<revision-string>`, a pure string
    /// transform with no filesystem access.
    pub fn path_of(&self, name: &str, arch: &str, revision: &str) -> PathBuf {
        self.dir.join(format!("{name}.{arch}.{revision}"))
    }

    pub fn is_cached(&self, name: &str, arch: &str, revision: &str) -> bool {
        self.path_of(name, arch, revision).is_file()
    }

    /// Render the list of cache entries as a table, matching the teacher's
    /// `tabled`-based `--list` output.
    pub fn list(&self, header: Option<&str>, items: &[CacheListItem]) -> String {
        let mut out = String::new();
        if let Some(header) = header {
            out.push_str(header);
            out.push('\n');
        }
        out.push_str(&Table::new(items).to_string());
        out
    }

    /// Scan the cache directory for canonical entries, skipping in-flight
    /// siblings (`<final>.<8hex>`).
    pub fn scan(&self) -> Result<Vec<CacheListItem>> {
        let mut items = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let parts: Vec<&str> = name.splitn(3, '.').collect();
            let [template, arch, revision] = parts[..] else { continue };
            if is_in_flight_suffix(revision) {
                continue;
            }
            items.push(CacheListItem {
                template: template.to_string(),
                arch: arch.to_string(),
                revision: revision.to_string(),
                size: entry.metadata().map(|m| m.len()).unwrap_or(0),
            });
        }
        debug!(count = items.len(), dir = %self.dir.display(), "scanned cache directory");
        Ok(items)
    }
}

/// True when `revision` actually carries a trailing `.<8hex>` in-flight
/// suffix, i.e. the direntry was `<final>.<8hex>` rather than a canonical
/// cache file.
fn is_in_flight_suffix(revision: &str) -> bool {
    match revision.rsplit_once('.') {
        Some((_, suffix)) => suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
        None => false,
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct CacheListItem {
    #[tabled(rename = "NAME")]
    pub template: String,
    #[tabled(rename = "ARCH")]
    pub arch: String,
    #[tabled(rename = "REVISION")]
    pub revision: String,
    #[tabled(rename = "SIZE")]
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn path_of_is_a_pure_string_transform() {
        let cache = Cache::new("/var/cache/imgforge");
        assert_eq!(
            cache.path_of("fedora", "x86_64", "3"),
            PathBuf::from("/var/cache/imgforge/fedora.x86_64.3")
        );
    }

    #[test]
    fn is_cached_only_checks_existence() -> Result<()> {
        let dir = tempdir()?;
        let cache = Cache::new(dir.path());
        cache.create()?;
        assert!(!cache.is_cached("fedora", "x86_64", "3"));
        std::fs::write(cache.path_of("fedora", "x86_64", "3"), b"data")?;
        assert!(cache.is_cached("fedora", "x86_64", "3"));
        Ok(())
    }

    #[test]
    fn clean_removes_existing_entries() -> Result<()> {
        let dir = tempdir()?;
        let cache = Cache::new(dir.path());
        cache.create()?;
        std::fs::write(cache.path_of("fedora", "x86_64", "3"), b"data")?;
        cache.clean()?;
        assert!(!cache.is_cached("fedora", "x86_64", "3"));
        assert!(dir.path().is_dir());
        Ok(())
    }

    #[test]
    fn scan_skips_in_flight_siblings() -> Result<()> {
        let dir = tempdir()?;
        let cache = Cache::new(dir.path());
        cache.create()?;
        std::fs::write(cache.path_of("fedora", "x86_64", "3"), b"data")?;
        std::fs::write(cache.dir().join("fedora.x86_64.3.deadbeef"), b"partial")?;
        let items = cache.scan()?;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].revision, "3");
        Ok(())
    }
}
