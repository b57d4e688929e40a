//! One `repos.d/*.conf` file: a flat `[name]\nuri=...` document using the
//! same grammar as native indexes (spec §4.6), minus the subkey machinery
//! that grammar also supports but source descriptors never use.

use std::path::Path;

use imgforge_index::ini::parse_sections;
use imgforge_platform::ProxyPolicy;
use imgforge_resource::{FormatTag, RepoSource};
use imgforge_verify::KeyDescriptor;
use tracing::warn;
use url::Url;

use crate::error::{Error, Result};

pub fn parse_descriptor(path: &Path, text: &str) -> Result<Vec<RepoSource>> {
    let sections = parse_sections(text);
    let mut sources = Vec::with_capacity(sections.len());

    for section in &sections {
        let uri_value = section.get("uri").ok_or_else(|| Error::MissingUri {
            path: path.to_path_buf(),
            section: section.name.clone(),
        })?;
        let uri = Url::parse(uri_value).map_err(|_| Error::BadUri {
            path: path.to_path_buf(),
            section: section.name.clone(),
            value: uri_value.to_string(),
        })?;

        let key = match section.get("gpgkey") {
            Some(raw) => match Url::parse(raw) {
                Ok(key_uri) if key_uri.scheme() == "file" => {
                    KeyDescriptor::KeyFile(key_uri.to_file_path().unwrap_or_else(|_| raw.into()))
                }
                _ => {
                    warn!(file = %path.display(), section = %section.name, gpgkey = raw, "ignoring gpgkey: only file:// URIs are accepted");
                    KeyDescriptor::NoKey
                }
            },
            None => KeyDescriptor::NoKey,
        };

        let proxy = match section.get("proxy") {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "no" | "off" => ProxyPolicy::Unset,
                "system" => ProxyPolicy::System,
                _ => ProxyPolicy::Forced(value.to_string()),
            },
            None => ProxyPolicy::System,
        };

        let format = match section.get("format") {
            Some(value) if value.eq_ignore_ascii_case("simplestreams") => FormatTag::SimpleStreams,
            _ => FormatTag::Native,
        };

        sources.push(
            RepoSource::new(section.name.clone(), uri)
                .with_key(key)
                .with_proxy(proxy)
                .with_format(format),
        );
    }

    Ok(sources)
}
