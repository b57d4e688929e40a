//! The simple-streams JSON index variant (spec §4.5): a root `index:1.0`
//! document pointing at one or more `products:1.0` product lists. Unlike the
//! native grammar, same-origin is not enforced here — the caller supplies
//! the tree root as `base_uri` and every relative path is resolved against
//! it.

use std::sync::Arc;

use imgforge_platform::ProxyPolicy;
use imgforge_resource::{Arch, IndexEntry, Revision};
use imgforge_verify::{Checksum, ChecksumKind, TrustChain};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// Parse the root `index:1.0` document, returning the `(name, uri)` pair for
/// every `products:1.0` list it advertises.
pub fn parse_root(text: &str, base_uri: &Url) -> Result<Vec<(String, Url)>> {
    let doc: Value = serde_json::from_str(text)?;
    expect_format(&doc, "index:1.0")?;

    let index = doc
        .get("index")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("root document is missing the `index` object"))?;

    let mut products = Vec::new();
    for (name, entry) in index {
        if entry.get("format").and_then(Value::as_str) != Some("products:1.0") {
            continue;
        }
        let path = entry
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(&format!("product list `{name}` has no `path`")))?;
        products.push((name.clone(), base_uri.join(path)?));
    }
    Ok(products)
}

/// Parse one `products:1.0` document into index entries, keeping only the
/// `disk1.img`/`disk.img` item of each product's newest version.
pub fn parse_products(
    text: &str,
    base_uri: &Url,
    trust: Arc<TrustChain>,
    proxy: ProxyPolicy,
) -> Result<Vec<IndexEntry>> {
    let doc: Value = serde_json::from_str(text)?;
    expect_format(&doc, "products:1.0")?;

    let products = doc
        .get("products")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("document is missing the `products` object"))?;

    let mut entries = Vec::new();
    for (product_id, product) in products {
        let arch = product
            .get("arch")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let display_name = product
            .get("release_title")
            .and_then(Value::as_str)
            .map(str::to_string);

        let versions = product
            .get("versions")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(&format!("product `{product_id}` has no `versions`")))?;

        let mut version_keys: Vec<&String> = versions.keys().collect();
        version_keys.sort_by(|a, b| b.cmp(a));
        let Some(newest) = version_keys.first() else {
            continue;
        };
        let version = &versions[newest.as_str()];

        let items = version
            .get("items")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed(&format!("product `{product_id}` version `{newest}` has no `items`")))?;

        let Some(item) = items.get("disk1.img").or_else(|| items.get("disk.img")) else {
            continue;
        };

        let path = item
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed(&format!("product `{product_id}` disk item has no `path`")))?;
        let file_uri = base_uri.join(path)?;
        let size = item.get("size").and_then(Value::as_u64).unwrap_or(0);

        let mut checksums = Vec::new();
        if let Some(sha256) = item.get("sha256").and_then(Value::as_str) {
            checksums.push(Checksum {
                kind: ChecksumKind::Sha256,
                hex: sha256.to_string(),
            });
        }

        entries.push(IndexEntry {
            os_version: product_id.clone(),
            display_name,
            osinfo_short_id: None,
            file_uri,
            arch: Arch::Specified(arch),
            signature_uri: None,
            checksums,
            revision: Revision::parse(newest),
            format: item.get("ftype").and_then(Value::as_str).map(str::to_string),
            size,
            compressed_size: None,
            expand: None,
            lv_expand: None,
            notes: Vec::new(),
            hidden: false,
            aliases: Vec::new(),
            trust: trust.clone(),
            proxy: proxy.clone(),
        });
    }
    Ok(entries)
}

fn expect_format(doc: &Value, expected: &str) -> Result<()> {
    let actual = doc.get("format").and_then(Value::as_str).unwrap_or("");
    if actual != expected {
        return Err(malformed(&format!("document format is `{actual}`, expected `{expected}`")));
    }
    Ok(())
}

fn malformed(reason: &str) -> Error {
    Error::MalformedSimpleStreams {
        reason: reason.to_string(),
    }
}
