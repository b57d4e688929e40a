//! The native INI-with-subkeys index grammar (spec §4.4).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use imgforge_platform::ProxyPolicy;
use imgforge_resource::{Arch, IndexEntry, Note, Revision};
use imgforge_verify::{Checksum, ChecksumKind, TrustChain};
use url::Url;

use crate::error::{Error, Result};
use crate::ini::parse_sections;

/// Parse a native index document into a deduplicated entry list.
///
/// `trust` and `proxy` come from the `RepoSource` the index was fetched
/// from, not from the document itself, since every entry inherits its
/// source's verifier and proxy policy. `template_mode` relaxes the
/// required-key rules for the repository-building tool (spec §4.4).
pub fn parse_native(
    text: &str,
    index_uri: &Url,
    trust: Arc<TrustChain>,
    proxy: ProxyPolicy,
    template_mode: bool,
) -> Result<Vec<IndexEntry>> {
    let sections = parse_sections(text);
    let mut entries = Vec::new();
    // Keyed on (name, arch, revision): an exact tie is an unresolvable
    // ambiguity and rejected outright, while two sections sharing a
    // (name, arch) at *different* revisions are legal and resolved by
    // `dedup_by_highest_revision` below (spec §4.4, §8 scenario 2).
    let mut seen_sections = HashSet::new();

    for section in &sections {
        if let Some((field, subkey)) = section.duplicate_subkeys("checksum") {
            return Err(Error::RepeatedSubkey {
                section: section.name.clone(),
                field,
                subkey,
            });
        }
        if let Some((field, subkey)) = section.duplicate_subkeys("notes") {
            return Err(Error::RepeatedSubkey {
                section: section.name.clone(),
                field,
                subkey,
            });
        }

        let arch = match section.get("arch") {
            Some(a) => Arch::Specified(a.to_string()),
            None if template_mode => Arch::Guessed("unknown".to_string()),
            None => {
                return Err(Error::MissingKey {
                    section: section.name.clone(),
                    key: "arch".to_string(),
                });
            }
        };

        let file = match section.get("file") {
            Some(f) => f,
            None if template_mode => "",
            None => {
                return Err(Error::MissingKey {
                    section: section.name.clone(),
                    key: "file".to_string(),
                });
            }
        };
        if !file.is_empty() && (file.contains("://") || file.starts_with('/')) {
            return Err(Error::BadFilePath {
                section: section.name.clone(),
                value: file.to_string(),
            });
        }

        let file_uri = if file.is_empty() {
            index_uri.clone()
        } else {
            resolve_relative(index_uri, file)?
        };

        let signature_uri = section
            .get("signature")
            .map(|s| resolve_relative(index_uri, s))
            .transpose()?;

        let size = match section.get("size") {
            Some(s) => s.parse::<u64>().map_err(|_| Error::UnparsableValue {
                section: section.name.clone(),
                key: "size".to_string(),
                value: s.to_string(),
            })?,
            None if template_mode => 0,
            None => {
                return Err(Error::MissingKey {
                    section: section.name.clone(),
                    key: "size".to_string(),
                });
            }
        };

        let compressed_size = section
            .get("compressed_size")
            .map(|s| {
                s.parse::<u64>().map_err(|_| Error::UnparsableValue {
                    section: section.name.clone(),
                    key: "compressed_size".to_string(),
                    value: s.to_string(),
                })
            })
            .transpose()?;

        let revision = match section.get("revision") {
            Some(r) => Revision::parse(r),
            None => Revision::Int(0),
        };

        let dedup_key = (section.name.clone(), arch.as_str().to_string(), revision.to_string());
        if !seen_sections.insert(dedup_key.clone()) {
            return Err(Error::DuplicateSection {
                name: dedup_key.0,
                arch: dedup_key.1,
            });
        }

        let hidden = match section.get("hidden") {
            Some(h) => parse_bool(h).ok_or_else(|| Error::UnparsableValue {
                section: section.name.clone(),
                key: "hidden".to_string(),
                value: h.to_string(),
            })?,
            None => false,
        };

        let mut checksums = Vec::new();
        for (subkey, value) in section.get_all_subkeyed("checksum") {
            let kind = match subkey {
                "sha256" => ChecksumKind::Sha256,
                "sha512" => ChecksumKind::Sha512,
                _ => continue,
            };
            checksums.push(Checksum {
                kind,
                hex: value.to_string(),
            });
        }

        let mut notes = Vec::new();
        if let Some(text) = section.get("notes") {
            notes.push(Note {
                lang: None,
                text: text.to_string(),
            });
        }
        for (lang, text) in section.get_all_subkeyed("notes") {
            notes.push(Note {
                lang: Some(lang.to_string()),
                text: text.to_string(),
            });
        }

        let aliases = section
            .get("aliases")
            .map(|a| a.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        entries.push(IndexEntry {
            os_version: section.name.clone(),
            display_name: section.get("name").map(str::to_string),
            osinfo_short_id: section.get("osinfo").map(str::to_string),
            file_uri,
            arch,
            signature_uri,
            checksums,
            revision,
            format: section.get("format").map(str::to_string),
            size,
            compressed_size,
            expand: section.get("expand").map(str::to_string),
            lv_expand: section.get("lv_expand").map(str::to_string),
            notes,
            hidden,
            aliases,
            trust: trust.clone(),
            proxy: proxy.clone(),
        });
    }

    Ok(dedup_by_highest_revision(entries))
}

fn resolve_relative(base: &Url, relative: &str) -> Result<Url> {
    base.join(relative).map_err(Error::from)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Keep only the entry at the highest revision for each `(name, arch)`,
/// breaking ties by first occurrence in source order (spec §4.4).
fn dedup_by_highest_revision(entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    let mut highest: HashMap<(String, String), Revision> = HashMap::new();
    for entry in &entries {
        highest
            .entry(entry.dedup_key())
            .and_modify(|r| {
                if entry.revision > *r {
                    *r = entry.revision.clone();
                }
            })
            .or_insert_with(|| entry.revision.clone());
    }

    let mut kept = HashSet::new();
    let mut out = Vec::new();
    for entry in entries {
        let key = entry.dedup_key();
        if kept.contains(&key) {
            continue;
        }
        if highest.get(&key) == Some(&entry.revision) {
            kept.insert(key);
            out.push(entry);
        }
    }
    out
}
