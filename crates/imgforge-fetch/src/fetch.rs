use std::path::{Path, PathBuf};

use imgforge_fs::{atomic_rename, register_cleanup, sibling_path};
use imgforge_platform::proxy::{envelope, Scheme};
use imgforge_platform::{Command, ProxyPolicy};
use imgforge_verify::TrustError;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::progress::{Phase, Progress, ProgressFn};

/// `(name, arch, revision)` identifying a cacheable template, as opposed to
/// a one-off download (an index, a signature, a checksum file).
#[derive(Debug, Clone)]
pub struct TemplateKey {
    pub name: String,
    pub arch: String,
    pub revision: String,
}

/// Downloads a URI via a configurable external transfer tool (spec §4.1).
/// Every download lands first at a sibling `<final>.<8hex>` path and is
/// atomically renamed into place on success, so concurrent builders sharing
/// one cache never observe a partial file.
pub struct Fetcher {
    transfer_tool: String,
}

impl Fetcher {
    pub fn new(transfer_tool: impl Into<String>) -> Self {
        Self { transfer_tool: transfer_tool.into() }
    }

    /// Download `uri`. When `template_key` and `cache` are both given and
    /// the cache already holds that entry, the download is skipped and the
    /// cache path is returned with `is_temporary = false`. Otherwise a
    /// fresh file is produced with `is_temporary = true`.
    ///
    /// `verify`, when given, runs against the *staging* file before it is
    /// renamed into place: the cache invariant (spec §3) is that a file at
    /// the canonical name is always trustworthy and complete, so trust
    /// verification must happen before `atomic_rename`, never after. On
    /// verification failure the staging file is removed and no byte is
    /// ever written under the canonical name (spec §8 I4, scenario 5).
    #[instrument(skip(self, progress, verify), fields(uri = %uri))]
    pub fn download(
        &self,
        uri: &Url,
        template_key: Option<&TemplateKey>,
        cache: Option<&Cache>,
        proxy: &ProxyPolicy,
        progress: Option<&ProgressFn>,
        verify: Option<&dyn Fn(&Path) -> std::result::Result<(), TrustError>>,
    ) -> Result<(PathBuf, bool)> {
        if let (Some(key), Some(cache)) = (template_key, cache) {
            let path = cache.path_of(&key.name, &key.arch, &key.revision);
            if path.is_file() {
                debug!(path = %path.display(), "cache hit, skipping download");
                return Ok((path, false));
            }
        }

        let (final_path, is_temporary) = match (template_key, cache) {
            (Some(key), Some(cache)) => (cache.path_of(&key.name, &key.arch, &key.revision), false),
            _ => (temp_destination(uri)?, true),
        };

        let staging = sibling_path(&final_path);
        let cleanup_path = staging.clone();
        register_cleanup(move || {
            let _ = std::fs::remove_file(&cleanup_path);
        });

        if let Some(cb) = progress {
            cb(Progress { phase: Phase::Connecting, bytes_downloaded: 0, total_bytes: None });
        }

        if uri.scheme() == "file" {
            self.copy_local(uri, &staging)?;
        } else {
            self.download_remote(uri, &staging, proxy, progress)?;
        }

        if let Some(verify) = verify {
            if let Err(e) = verify(&staging) {
                warn!(path = %staging.display(), error = %e, "trust verification failed; discarding staged download");
                let _ = std::fs::remove_file(&staging);
                return Err(Error::TrustFailure(e));
            }
        }

        atomic_rename(&staging, &final_path)?;
        if let Some(cb) = progress {
            cb(Progress { phase: Phase::Committing, bytes_downloaded: 0, total_bytes: None });
        }
        info!(path = %final_path.display(), "download complete");
        Ok((final_path, is_temporary))
    }

    fn copy_local(&self, uri: &Url, staging: &Path) -> Result<()> {
        let source = uri.to_file_path().map_err(|_| Error::NotALocalPath(uri.to_string()))?;
        std::fs::copy(&source, staging)?;
        Ok(())
    }

    fn download_remote(
        &self,
        uri: &Url,
        staging: &Path,
        proxy: &ProxyPolicy,
        progress: Option<&ProgressFn>,
    ) -> Result<()> {
        let scheme = scheme_of(uri);
        let env = envelope(proxy, scheme);

        let status = self.head_status(uri, &env)?;
        if !(200..300).contains(&status) {
            return Err(Error::BadStatus { uri: uri.to_string(), status });
        }

        if let Some(cb) = progress {
            cb(Progress { phase: Phase::Downloading, bytes_downloaded: 0, total_bytes: None });
        }

        Command::new(&self.transfer_tool)
            .args(["-fsSL", "-o"])
            .arg(staging)
            .arg(uri.as_str())
            .envs(env)
            .run()?;

        let size = std::fs::metadata(staging).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(Error::EmptyResponse { uri: uri.to_string() });
        }
        Ok(())
    }

    /// Issue a HEAD-equivalent request and return the numeric status code.
    fn head_status(&self, uri: &Url, env: &[(String, String)]) -> Result<u16> {
        let output = Command::new(&self.transfer_tool)
            .args(["-fsSL", "-o", "/dev/null", "-w", "%{http_code}", "-I"])
            .arg(uri.as_str())
            .envs(env.to_vec())
            .output()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.trim().parse::<u16>().map_err(|_| Error::StatusParse {
            uri: uri.to_string(),
            reason: format!("unparsable status output: {stdout:?}"),
        })
    }
}

fn scheme_of(uri: &Url) -> Scheme {
    match uri.scheme() {
        "https" => Scheme::Https,
        "ftp" => Scheme::Ftp,
        _ => Scheme::Http,
    }
}

/// A fresh temporary destination for a non-cacheable download, named after
/// the URI's last path segment so the file is recognizable on disk.
fn temp_destination(uri: &Url) -> Result<PathBuf> {
    let name = uri
        .path_segments()
        .and_then(|mut segs| segs.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("download");
    Ok(std::env::temp_dir().join(format!("imgforge-{}-{name}", imgforge_fs::random_suffix())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn downloads_a_file_uri_via_local_copy() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("source.xz");
        std::fs::write(&src, b"template-bytes")?;
        let dest_dir = dir.path().join("cache");
        std::fs::create_dir_all(&dest_dir)?;

        let fetcher = Fetcher::new("curl");
        let uri = Url::from_file_path(&src).unwrap();
        let cache = Cache::new(&dest_dir);
        let key = TemplateKey { name: "fedora".into(), arch: "x86_64".into(), revision: "3".into() };
        let (path, is_temp) = fetcher.download(&uri, Some(&key), Some(&cache), &ProxyPolicy::System, None, None)?;
        assert!(!is_temp);
        assert_eq!(path, cache.path_of("fedora", "x86_64", "3"));
        assert_eq!(std::fs::read(&path)?, b"template-bytes");
        Ok(())
    }

    #[test]
    fn skips_download_when_already_cached() -> Result<()> {
        let dir = tempdir()?;
        let cache = Cache::new(dir.path());
        cache.create()?;
        let key = TemplateKey { name: "fedora".into(), arch: "x86_64".into(), revision: "3".into() };
        std::fs::write(cache.path_of(&key.name, &key.arch, &key.revision), b"cached")?;

        let fetcher = Fetcher::new("curl");
        // An unreachable URI would fail if actually fetched; cache hit must
        // short-circuit before any transfer tool runs.
        let uri = Url::parse("https://example.invalid/should-not-be-fetched.xz").unwrap();
        let (path, is_temp) = fetcher.download(&uri, Some(&key), Some(&cache), &ProxyPolicy::System, None, None)?;
        assert!(!is_temp);
        assert_eq!(std::fs::read(&path)?, b"cached");
        Ok(())
    }

    #[test]
    fn non_cacheable_download_of_a_local_file_is_temporary() -> Result<()> {
        let dir = tempdir()?;
        let src = dir.path().join("index.asc");
        std::fs::write(&src, b"index-bytes")?;
        let fetcher = Fetcher::new("curl");
        let uri = Url::from_file_path(&src).unwrap();
        let (path, is_temp) = fetcher.download(&uri, None, None, &ProxyPolicy::System, None, None)?;
        assert!(is_temp);
        assert_eq!(std::fs::read(&path)?, b"index-bytes");
        std::fs::remove_file(path).ok();
        Ok(())
    }

    #[test]
    fn failed_verification_leaves_no_canonical_cache_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("source.xz");
        std::fs::write(&src, b"tampered-bytes").unwrap();
        let dest_dir = dir.path().join("cache");
        std::fs::create_dir_all(&dest_dir).unwrap();

        let fetcher = Fetcher::new("curl");
        let uri = Url::from_file_path(&src).unwrap();
        let cache = Cache::new(&dest_dir);
        let key = TemplateKey { name: "fedora".into(), arch: "x86_64".into(), revision: "3".into() };
        let canonical = cache.path_of(&key.name, &key.arch, &key.revision);

        let always_fails = |_path: &Path| -> std::result::Result<(), TrustError> {
            Err(TrustError::ChecksumMismatch { kind: "sha256", expected: "deadbeef".into(), actual: "cafef00d".into() })
        };
        let err = fetcher
            .download(&uri, Some(&key), Some(&cache), &ProxyPolicy::System, None, Some(&always_fails))
            .unwrap_err();
        assert!(matches!(err, Error::TrustFailure(_)));
        // The canonical name must be absent: a failed verification never
        // commits bytes under the trusted name (spec §8 I4, scenario 5).
        assert!(!canonical.is_file());
        assert!(std::fs::read_dir(&dest_dir).unwrap().next().is_none());
    }
}
