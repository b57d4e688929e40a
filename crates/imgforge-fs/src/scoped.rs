use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::exit::register_cleanup;

/// A directory that is created on construction and guaranteed to be removed
/// recursively both when dropped normally and when the process exits via
/// [`crate::run_cleanups`] (wired to a Ctrl-C handler by the `imgforge` binary).
///
/// Used for the trust chain's scoped GPG keyring and for the planner's
/// temporary transformation outputs.
pub struct ScopedDir {
    path: PathBuf,
}

impl ScopedDir {
    pub fn new_in(parent: &Path, prefix: &str) -> Result<Self> {
        let path = parent.join(format!("{prefix}.{}", crate::random_suffix()));
        std::fs::create_dir_all(&path).map_err(|e| Error::Create {
            path: path.clone(),
            source: e,
        })?;
        let cleanup_path = path.clone();
        register_cleanup(move || {
            let _ = std::fs::remove_dir_all(&cleanup_path);
        });
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn scoped_dir_exists_while_alive_and_gone_after_drop() -> Result<()> {
        let parent = tempdir()?;
        let path;
        {
            let scoped = ScopedDir::new_in(parent.path(), "keyring")?;
            path = scoped.path().to_path_buf();
            assert!(path.is_dir());
        }
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn scoped_dir_names_are_unique() -> Result<()> {
        let parent = tempdir()?;
        let a = ScopedDir::new_in(parent.path(), "keyring")?;
        let b = ScopedDir::new_in(parent.path(), "keyring")?;
        assert_ne!(a.path(), b.path());
        Ok(())
    }
}
