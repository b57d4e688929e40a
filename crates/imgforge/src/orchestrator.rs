//! The Orchestrator (spec §4.11, component 11 of §2): the top-level flow
//! wiring source resolution, trust, fetch, planning, execution, and guest
//! customization into one build.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use imgforge_customize::{CustomizeOp, CustomizeOptions, Customizer, GuestFs};
use imgforge_exec::{ExecOptions, Executor};
use imgforge_fetch::{Cache, Fetcher, ProgressFn, TemplateKey};
use imgforge_index::{parse_native, parse_simplestreams_products, parse_simplestreams_root};
use imgforge_plan::{plan as run_planner, Goal, Plan};
use imgforge_platform::dirs::default_cache_dir;
use imgforge_resource::{FormatTag, IndexEntry, TagSet};
use imgforge_source::SourceRegistry;
use imgforge_verify::TrustChain;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{BuildError, Result};

const PROGRAM: &str = "imgforge";
const MAX_PLAN_DEPTH: u32 = 8;

/// Everything the Orchestrator needs to carry out one build, collected from
/// the CLI layer.
pub struct BuildRequest {
    pub os_version: String,
    pub output: PathBuf,
    pub size: Option<u64>,
    pub format: Option<String>,
    pub cli_sources: Vec<(String, Url)>,
    pub fingerprints: Vec<String>,
    pub cache_dir: Option<PathBuf>,
    pub no_cache: bool,
    pub check_signature: bool,
    pub dry_run: bool,
    pub sync: bool,
    pub output_is_block_device: bool,
    /// User opt-out of the default delete-partial-output-on-failure policy
    /// (spec §4.9 cleanup discipline); has no effect for block-device
    /// outputs, which are never deleted regardless.
    pub no_delete_on_failure: bool,
    pub ops: Vec<CustomizeOp>,
    pub transfer_tool: String,
}

/// What a build produced: either the chosen plan alone (`--dry-run`) or the
/// finished image path.
pub enum BuildOutcome {
    Plan(Plan),
    Built(PathBuf),
}

pub struct Orchestrator;

impl Orchestrator {
    /// Run a build end to end. `guest` is the customization backend the
    /// host supplies; it is only touched when `request.ops` is non-empty,
    /// since the guest-fs API has no implementation in this workspace.
    /// `progress`, when given, is driven through the template's download
    /// only — the index downloads that precede it are small enough not to
    /// warrant one.
    #[instrument(skip(self, request, guest, progress), fields(os_version = %request.os_version))]
    pub fn run(&self, request: &BuildRequest, guest: Option<&mut dyn GuestFs>, progress: Option<&ProgressFn>) -> Result<BuildOutcome> {
        let scratch = tempfile::tempdir()?;

        let registry = SourceRegistry::scan(PROGRAM)?
            .with_cli_sources(request.cli_sources.clone(), request.fingerprints.clone())?;
        if registry.is_empty() {
            return Err(BuildError::Config(
                "no repository sources configured; add repos.d entries or pass --source".to_string(),
            ));
        }

        let cache = self.resolve_cache(request)?;
        let fetcher = Fetcher::new(request.transfer_tool.clone());

        let entry = self.resolve_entry(&registry, &fetcher, scratch.path(), request)?;

        let (template_path, _was_cached) = self.fetch_template(&fetcher, &cache, &entry, request, progress)?;

        let mut initial = TagSet::new()
            .with_template(true)
            .with_filename(&template_path)
            .with_size(entry.size)
            .with_xz(is_xz_filename(&template_path));
        if let Some(format) = &entry.format {
            initial = initial.with_format(format.clone());
        }

        let must_have = {
            let mut goal = Goal::new().with_filename(&request.output);
            if let Some(size) = request.size {
                goal = goal.with_size(size);
            }
            if let Some(format) = &request.format {
                goal = goal.with_format(format.clone());
            }
            goal
        };
        let must_not_have = Goal { template: true, xz: true, ..Goal::new() };

        let cache_dir_for_temp = cache.as_ref().map(|c| c.dir().to_path_buf()).unwrap_or_else(|| scratch.path().to_path_buf());
        let next_temp = {
            let dir = cache_dir_for_temp.clone();
            move || dir.join(format!("imgforge-{}.tmp", uuid::Uuid::new_v4()))
        };

        let plan = run_planner(initial, &must_have, &must_not_have, request.output_is_block_device, MAX_PLAN_DEPTH, next_temp)?;
        info!(steps = plan.steps.len(), weight = plan.total_weight(), "plan chosen");

        if request.dry_run {
            return Ok(BuildOutcome::Plan(plan));
        }

        let exec_options = ExecOptions {
            output_is_block_device: request.output_is_block_device,
            delete_output_on_failure: !request.output_is_block_device && !request.no_delete_on_failure,
            expand: entry.expand.clone(),
            lv_expand: entry.lv_expand.clone(),
            ..ExecOptions::default()
        };
        let executor = Executor::new(exec_options);
        let built = executor.run(&plan, &template_path)?;

        if !request.ops.is_empty() {
            // The Customizer fsyncs the output itself when `--sync` was
            // requested, since it owns the guest-fs session's teardown.
            self.customize(&built, request, guest)?;
        } else if request.sync {
            sync_output(&built)?;
        }

        Ok(BuildOutcome::Built(built))
    }

    fn resolve_cache(&self, request: &BuildRequest) -> Result<Option<Cache>> {
        if request.no_cache {
            return Ok(None);
        }
        let dir = match &request.cache_dir {
            Some(dir) => dir.clone(),
            None => match default_cache_dir(PROGRAM) {
                Some(dir) => dir,
                None => {
                    warn!("could not determine a cache directory; continuing without a cache");
                    return Ok(None);
                }
            },
        };
        let cache = Cache::new(dir);
        if let Err(e) = cache.create() {
            warn!(error = %e, "could not create cache directory; continuing without a cache");
            return Ok(None);
        }
        Ok(Some(cache))
    }

    /// Download and parse every source's index in registry order, returning
    /// the first entry whose name or alias matches the requested os-version
    /// (spec §8 scenario 1).
    fn resolve_entry(
        &self,
        registry: &SourceRegistry,
        fetcher: &Fetcher,
        scratch: &Path,
        request: &BuildRequest,
    ) -> Result<IndexEntry> {
        for source in registry.sources() {
            let trust = Arc::new(TrustChain::new("gpg", source.key.clone(), request.check_signature, scratch)?);

            let (index_path, _) = fetcher.download(&source.uri, None, None, &source.proxy, None, None)?;
            let index_text = std::fs::read_to_string(&index_path)?;

            let entries = match source.format {
                FormatTag::Native => parse_native(&index_text, &source.uri, Arc::clone(&trust), source.proxy.clone(), false)?,
                FormatTag::SimpleStreams => {
                    let mut all = Vec::new();
                    for (_name, product_uri) in parse_simplestreams_root(&index_text, &source.uri)? {
                        let (product_path, _) = fetcher.download(&product_uri, None, None, &source.proxy, None, None)?;
                        let product_text = std::fs::read_to_string(&product_path)?;
                        all.extend(parse_simplestreams_products(&product_text, &product_uri, Arc::clone(&trust), source.proxy.clone())?);
                    }
                    all
                }
            };

            if let Some(entry) = entries.into_iter().find(|e| e.matches_name(&request.os_version)) {
                debug!(source = %source.name, os_version = %request.os_version, "resolved template entry");
                return Ok(entry);
            }
        }

        Err(BuildError::TemplateNotFound(request.os_version.clone()))
    }

    /// Download the template and verify it per spec §4.3: checksums, when
    /// present, are authoritative and a detached signature is not required
    /// on top of them (Open Question Decision #2).
    ///
    /// Verification runs against the *staged* download, inside
    /// `Fetcher::download`, before it commits the file under its canonical
    /// cache name — never after. A file at the canonical name must always
    /// be trustworthy (spec §3 Cache invariant, §8 I4/scenario 5); verifying
    /// only once the rename has already happened would let a tampered or
    /// corrupted download permanently poison that cache slot.
    fn fetch_template(
        &self,
        fetcher: &Fetcher,
        cache: &Option<Cache>,
        entry: &IndexEntry,
        request: &BuildRequest,
        progress: Option<&ProgressFn>,
    ) -> Result<(PathBuf, bool)> {
        let key = TemplateKey {
            name: entry.os_version.clone(),
            arch: entry.arch.as_str().to_string(),
            revision: entry.revision.to_string(),
        };
        let already_cached = cache.as_ref().is_some_and(|c| c.is_cached(&key.name, &key.arch, &key.revision));

        // A detached signature has to be in hand before the template's
        // staged download can be checked against it, so it's fetched first.
        // Skipped on a cache hit: a canonical cache file was already
        // verified the one time it was written.
        let sig_path = match (&entry.signature_uri, already_cached) {
            (Some(sig_uri), false) if entry.checksums.is_empty() => {
                Some(fetcher.download(sig_uri, None, None, &entry.proxy, None, None)?.0)
            }
            _ => None,
        };

        let verify = |staged: &Path| -> std::result::Result<(), imgforge_verify::TrustError> {
            if !entry.checksums.is_empty() {
                entry.trust.verify_checksums(&entry.checksums, staged)
            } else if let Some(sig_path) = &sig_path {
                entry.trust.verify_detached(staged, Some(sig_path))
            } else if request.check_signature {
                entry.trust.verify_detached(staged, None)
            } else {
                Ok(())
            }
        };

        let (path, is_temporary) =
            fetcher.download(&entry.file_uri, Some(&key), cache.as_ref(), &entry.proxy, progress, Some(&verify))?;

        Ok((path, !is_temporary))
    }

    fn customize(&self, image_path: &Path, request: &BuildRequest, guest: Option<&mut dyn GuestFs>) -> Result<()> {
        let Some(guest) = guest else {
            return Err(BuildError::Config(
                "guest customization was requested but no guest-fs backend was supplied".to_string(),
            ));
        };
        let options = CustomizeOptions { sync: request.sync, ..CustomizeOptions::default() };
        let customizer = Customizer::new(options);
        customizer.run(guest, image_path, &request.ops)?;
        Ok(())
    }
}

fn is_xz_filename(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("xz")
}

fn sync_output(path: &Path) -> Result<()> {
    let file = std::fs::File::open(path)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgforge_resource::{Arch, IndexEntry, Note, Revision};
    use imgforge_verify::{Checksum, ChecksumKind, KeyDescriptor};

    fn trust(scratch: &Path) -> Arc<TrustChain> {
        Arc::new(TrustChain::new("gpg", KeyDescriptor::NoKey, true, scratch).unwrap())
    }

    fn entry_for(file_uri: Url, checksums: Vec<Checksum>, trust: Arc<TrustChain>) -> IndexEntry {
        IndexEntry {
            os_version: "fedora-30".to_string(),
            display_name: None,
            osinfo_short_id: None,
            file_uri,
            arch: Arch::Specified("x86_64".to_string()),
            signature_uri: None,
            checksums,
            revision: Revision::Int(1),
            format: None,
            size: 14,
            compressed_size: None,
            expand: None,
            lv_expand: None,
            notes: Vec::<Note>::new(),
            hidden: false,
            aliases: vec![],
            trust,
            proxy: imgforge_platform::ProxyPolicy::System,
        }
    }

    fn request() -> BuildRequest {
        BuildRequest {
            os_version: "fedora-30".to_string(),
            output: PathBuf::from("out.img"),
            size: None,
            format: None,
            cli_sources: vec![],
            fingerprints: vec![],
            cache_dir: None,
            no_cache: false,
            check_signature: true,
            dry_run: false,
            sync: false,
            output_is_block_device: false,
            no_delete_on_failure: false,
            ops: vec![],
            transfer_tool: "curl".to_string(),
        }
    }

    /// Scenario 5 (spec §8): a template whose computed checksum differs from
    /// the index entry aborts with a trust failure, and the canonical cache
    /// name is absent afterwards — the rename into the cache never happens
    /// ahead of verification.
    #[test]
    fn fetch_template_removes_the_staged_file_on_checksum_mismatch() {
        let scratch = tempfile::tempdir().unwrap();
        let src_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("fedora-30.xz");
        std::fs::write(&source, b"template-bytes").unwrap();

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(cache_dir.path());
        cache.create().unwrap();

        let entry = entry_for(
            Url::from_file_path(&source).unwrap(),
            vec![Checksum { kind: ChecksumKind::Sha256, hex: "0".repeat(64) }],
            trust(scratch.path()),
        );
        let canonical = cache.path_of(&entry.os_version, entry.arch.as_str(), &entry.revision.to_string());

        let fetcher = Fetcher::new("curl");
        let err = Orchestrator
            .fetch_template(&fetcher, &Some(cache), &entry, &request(), None)
            .unwrap_err();
        assert!(matches!(err, BuildError::FetchError(_)));
        assert!(!canonical.is_file());
        assert!(std::fs::read_dir(cache_dir.path()).unwrap().next().is_none());
    }

    /// The matching-checksum counterpart: verification succeeds before the
    /// rename, and the canonical cache file ends up present and readable.
    #[test]
    fn fetch_template_commits_the_canonical_cache_file_on_matching_checksum() {
        let scratch = tempfile::tempdir().unwrap();
        let src_dir = tempfile::tempdir().unwrap();
        let source = src_dir.path().join("fedora-30.xz");
        std::fs::write(&source, b"template-bytes").unwrap();
        let expected_hex = hex::encode(imgforge_verify::Sha256Hasher::digest(b"template-bytes"));

        let cache_dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(cache_dir.path());
        cache.create().unwrap();

        let entry = entry_for(
            Url::from_file_path(&source).unwrap(),
            vec![Checksum { kind: ChecksumKind::Sha256, hex: expected_hex }],
            trust(scratch.path()),
        );
        let canonical = cache.path_of(&entry.os_version, entry.arch.as_str(), &entry.revision.to_string());

        let fetcher = Fetcher::new("curl");
        let (path, is_permanent) = Orchestrator
            .fetch_template(&fetcher, &Some(cache), &entry, &request(), None)
            .unwrap();
        assert!(is_permanent);
        assert_eq!(path, canonical);
        assert!(canonical.is_file());
        assert_eq!(std::fs::read(&canonical).unwrap(), b"template-bytes");
    }
}
