//! Assembles the ordered list of configured repositories: `repos.d`
//! descriptors under XDG config paths, with CLI-supplied sources prepended
//! (spec §4.6).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use imgforge_platform::dirs::repos_d_dirs;
use imgforge_resource::RepoSource;
use imgforge_verify::KeyDescriptor;
use tracing::debug;
use url::Url;

use crate::descriptor::parse_descriptor;
use crate::error::{Error, Result};

/// The ordered set of configured repositories a build resolves names
/// against. Earlier entries take precedence on name collision.
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    sources: Vec<RepoSource>,
}

impl SourceRegistry {
    /// Scan `$XDG_CONFIG_HOME/<program>/repos.d` then each
    /// `$XDG_CONFIG_DIRS` entry's `<program>/repos.d`, in that order. A
    /// `*.conf` basename already seen in an earlier directory is not
    /// reparsed — later directories never override earlier ones.
    pub fn scan(program: &str) -> Result<Self> {
        let mut seen_basenames = HashSet::new();
        let mut sources = Vec::new();

        for dir in repos_d_dirs(program) {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Error::Io(e)),
            };

            let mut paths: Vec<_> = entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("conf"))
                .collect();
            paths.sort();

            for path in paths {
                let Some(basename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                    continue;
                };
                if seen_basenames.contains(&basename) {
                    continue;
                }

                let text = fs::read_to_string(&path)?;
                let parsed = parse_descriptor(&path, &text)?;
                seen_basenames.insert(basename);
                debug!(file = %path.display(), count = parsed.len(), "loaded source descriptor");
                sources.extend(parsed);
            }
        }

        Ok(Self { sources })
    }

    /// Prepend CLI `--source name=uri` pairs, applying `fingerprints` either
    /// one-per-source or a single value shared by all (spec §4.6).
    pub fn with_cli_sources(mut self, cli_sources: Vec<(String, Url)>, fingerprints: Vec<String>) -> Result<Self> {
        if cli_sources.is_empty() {
            return Ok(self);
        }

        let resolved: Vec<KeyDescriptor> = if fingerprints.is_empty() {
            vec![KeyDescriptor::NoKey; cli_sources.len()]
        } else if fingerprints.len() == 1 {
            vec![KeyDescriptor::Fingerprint(fingerprints[0].clone()); cli_sources.len()]
        } else if fingerprints.len() == cli_sources.len() {
            fingerprints.into_iter().map(KeyDescriptor::Fingerprint).collect()
        } else {
            return Err(Error::FingerprintCountMismatch {
                given: fingerprints.len(),
                sources: cli_sources.len(),
            });
        };

        let mut prepended: Vec<RepoSource> = cli_sources
            .into_iter()
            .zip(resolved)
            .map(|((name, uri), key)| RepoSource::new(name, uri).with_key(key))
            .collect();
        prepended.extend(self.sources);
        self.sources = prepended;
        Ok(self)
    }

    pub fn sources(&self) -> &[RepoSource] {
        &self.sources
    }

    pub fn find(&self, name: &str) -> Option<&RepoSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// True if every source descriptor under `dir` is readable; used by the
    /// orchestrator to decide whether to warn about an empty configuration.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn write_conf(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn scans_repos_d_and_parses_every_conf_file() {
        let _guard = ENV_LOCK.lock().unwrap();
        let home = tempfile::tempdir().unwrap();
        let repos_d = home.path().join("imgforge").join("repos.d");
        fs::create_dir_all(&repos_d).unwrap();
        write_conf(&repos_d, "repo1.conf", "[repo1]\nuri=https://example.invalid/a\n");

        let saved = std::env::var_os("XDG_CONFIG_HOME");
        let saved_dirs = std::env::var_os("XDG_CONFIG_DIRS");
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", home.path());
            std::env::set_var("XDG_CONFIG_DIRS", "/nonexistent/xdg");
        }

        let registry = SourceRegistry::scan("imgforge").unwrap();
        assert_eq!(registry.sources().len(), 1);
        assert_eq!(registry.sources()[0].name, "repo1");

        match saved {
            Some(v) => unsafe { std::env::set_var("XDG_CONFIG_HOME", v) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }
        match saved_dirs {
            Some(v) => unsafe { std::env::set_var("XDG_CONFIG_DIRS", v) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_DIRS") },
        }
    }

    #[test]
    fn cli_sources_are_prepended_before_file_based_ones() {
        let registry = SourceRegistry::default();
        let registry = registry
            .with_cli_sources(
                vec![("cli-repo".to_string(), Url::parse("https://example.invalid/cli").unwrap())],
                vec!["ABCDEF0123456789ABCDEF0123456789ABCDEF01".to_string()],
            )
            .unwrap();
        assert_eq!(registry.sources()[0].name, "cli-repo");
        assert!(matches!(registry.sources()[0].key, KeyDescriptor::Fingerprint(_)));
    }

    #[test]
    fn single_fingerprint_applies_to_every_cli_source() {
        let registry = SourceRegistry::default()
            .with_cli_sources(
                vec![
                    ("a".to_string(), Url::parse("https://example.invalid/a").unwrap()),
                    ("b".to_string(), Url::parse("https://example.invalid/b").unwrap()),
                ],
                vec!["FINGERPRINT".to_string()],
            )
            .unwrap();
        assert_eq!(registry.sources().len(), 2);
        for source in registry.sources() {
            assert_eq!(source.key, KeyDescriptor::Fingerprint("FINGERPRINT".to_string()));
        }
    }

    #[test]
    fn mismatched_fingerprint_count_is_rejected() {
        let err = SourceRegistry::default()
            .with_cli_sources(
                vec![
                    ("a".to_string(), Url::parse("https://example.invalid/a").unwrap()),
                    ("b".to_string(), Url::parse("https://example.invalid/b").unwrap()),
                ],
                vec!["one".to_string(), "two".to_string(), "three".to_string()],
            )
            .unwrap_err();
        assert!(matches!(err, Error::FingerprintCountMismatch { .. }));
    }
}
