use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{Error, Result};

/// Eight lowercase hex characters, matching the in-flight download naming
/// scheme (`<final>.<8-hex-random>`).
pub fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    let n: u32 = rng.r#gen();
    format!("{n:08x}")
}

/// Build the sibling path used for an in-flight write: `<final>.<8hex>`.
pub fn sibling_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}", random_suffix()));
    final_path.with_file_name(name)
}

/// Rename `from` onto `to`, removing `from` on failure so no stray sibling
/// file is left behind.
pub fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|e| {
        let _ = std::fs::remove_file(from);
        Error::Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn random_suffix_is_eight_lowercase_hex() {
        let s = random_suffix();
        assert_eq!(s.len(), 8);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn sibling_path_appends_suffix_next_to_final_name() {
        let base = Path::new("/cache/fedora.x86_64.3");
        let sib = sibling_path(base);
        assert_eq!(sib.parent(), base.parent());
        let name = sib.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("fedora.x86_64.3."));
        assert_eq!(name.len(), "fedora.x86_64.3.".len() + 8);
    }

    #[test]
    fn atomic_rename_moves_file_into_place() -> Result<()> {
        let dir = tempdir()?;
        let from = dir.path().join("tmp.abcdef12");
        let to = dir.path().join("final");
        std::fs::write(&from, b"payload")?;
        atomic_rename(&from, &to)?;
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to)?, b"payload");
        Ok(())
    }

    #[test]
    fn atomic_rename_removes_sibling_on_failure() -> Result<()> {
        let dir = tempdir()?;
        let from = dir.path().join("tmp.abcdef12");
        std::fs::write(&from, b"payload")?;
        // `to` with a missing parent directory forces the rename to fail.
        let to = dir.path().join("missing-parent").join("final");
        assert!(atomic_rename(&from, &to).is_err());
        assert!(!from.exists());
        Ok(())
    }
}
