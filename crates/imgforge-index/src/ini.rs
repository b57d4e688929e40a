//! A minimal scanner for the `[section]\nkey[subkey]=value` grammar shared by
//! native indexes (spec §4.4) and source descriptors (spec §4.6). It knows
//! nothing about what the keys mean; `native.rs` gives them meaning.

#[derive(Debug, Clone)]
pub struct RawEntry {
    pub field: String,
    pub subkey: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct RawSection {
    pub name: String,
    pub entries: Vec<RawEntry>,
}

/// Parse an INI-with-subkeys document into an ordered list of sections.
/// Lines beginning with a single leading space continue the previous key's
/// value, joined by a newline.
pub fn parse_sections(text: &str) -> Vec<RawSection> {
    let mut sections = Vec::new();
    let mut current: Option<RawSection> = None;
    let mut continuing: Option<usize> = None;

    for raw_line in text.lines() {
        if let Some(rest) = raw_line.strip_prefix(' ') {
            if let (Some(sec), Some(idx)) = (current.as_mut(), continuing) {
                sec.entries[idx].value.push('\n');
                sec.entries[idx].value.push_str(rest.trim_end());
                continue;
            }
        }

        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if let Some(sec) = current.take() {
                sections.push(sec);
            }
            current = Some(RawSection {
                name: name.to_string(),
                entries: Vec::new(),
            });
            continuing = None;
            continue;
        }

        if let Some((key_part, value)) = line.split_once('=') {
            let (field, subkey) = split_key(key_part.trim());
            if let Some(sec) = current.as_mut() {
                sec.entries.push(RawEntry {
                    field,
                    subkey,
                    value: value.trim().to_string(),
                });
                continuing = Some(sec.entries.len() - 1);
            }
        }
    }
    if let Some(sec) = current.take() {
        sections.push(sec);
    }
    sections
}

fn split_key(key: &str) -> (String, Option<String>) {
    if let Some(open) = key.find('[') {
        if let Some(sub) = key.strip_suffix(']').and_then(|s| s.get(open + 1..)) {
            return (key[..open].to_string(), Some(sub.to_string()));
        }
    }
    (key.to_string(), None)
}

impl RawSection {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.field == field && e.subkey.is_none())
            .map(|e| e.value.as_str())
    }

    pub fn get_all_subkeyed<'a>(&'a self, field: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.entries
            .iter()
            .filter(move |e| e.field == field)
            .filter_map(|e| e.subkey.as_deref().map(|k| (k, e.value.as_str())))
    }

    /// All `(subkey, value)` duplicates for a given field: every subkey value
    /// that repeats more than once.
    pub fn duplicate_subkeys(&self, field: &str) -> Option<(String, String)> {
        let mut seen = std::collections::HashSet::new();
        for (sub, _) in self.get_all_subkeyed(field) {
            if !seen.insert(sub) {
                return Some((field.to_string(), sub.to_string()));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_key_value_pairs_into_a_section() {
        let sections = parse_sections("[fedora]\nfile=fedora.xz\narch=x86_64\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "fedora");
        assert_eq!(sections[0].get("file"), Some("fedora.xz"));
        assert_eq!(sections[0].get("arch"), Some("x86_64"));
    }

    #[test]
    fn subkeyed_entries_are_distinct_from_the_bare_field() {
        let sections = parse_sections("[fedora]\nchecksum[sha512]=abcd\nchecksum[sha256]=ef01\n");
        let checksums: Vec<_> = sections[0].get_all_subkeyed("checksum").collect();
        assert_eq!(checksums, vec![("sha512", "abcd"), ("sha256", "ef01")]);
    }

    #[test]
    fn continuation_lines_join_with_a_newline() {
        let sections = parse_sections("[fedora]\nnotes=First line\n Continuation line\n");
        assert_eq!(sections[0].get("notes"), Some("First line\nContinuation line"));
    }

    #[test]
    fn duplicate_subkeys_within_one_section_are_detected() {
        let sections = parse_sections("[fedora]\nchecksum[sha512]=abcd\nchecksum[sha512]=ef01\n");
        assert_eq!(
            sections[0].duplicate_subkeys("checksum"),
            Some(("checksum".to_string(), "sha512".to_string()))
        );
    }

    #[test]
    fn multiple_sections_are_parsed_in_source_order() {
        let sections = parse_sections("[a]\nfile=a.xz\n[b]\nfile=b.xz\n");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "a");
        assert_eq!(sections[1].name, "b");
    }
}
