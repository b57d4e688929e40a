use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};

/// Create `path` as a regular file truncated to `size` bytes, preserving
/// sparseness for the zero-filled remainder.
///
/// Writes a single byte before extending via `set_len` rather than calling
/// `set_len` on a freshly-created empty file: ext4's `auto_da_alloc` heuristic
/// treats create+truncate-to-size with no intervening write as the
/// truncate-overwrite pattern used by editors and forces extra flushes on
/// close.
pub fn create_sparse_file(path: &Path, size: u64) -> Result<File> {
    let file = File::create(path).map_err(|e| Error::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    if size > 0 {
        pwrite(&file, 0, &[0u8])?;
    }
    file.set_len(size).map_err(|e| Error::Create {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(file)
}

/// Write `data` at `offset` in `file` without disturbing the file's current
/// seek position. Safe to call concurrently from multiple threads sharing
/// the same open file, as long as regions don't overlap.
#[cfg(unix)]
pub fn pwrite(file: &File, offset: u64, data: &[u8]) -> Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_at(data, offset)
        .map(|_| ())
        .map_err(|e| Error::PositionalWrite { offset, source: e })
}

#[cfg(windows)]
pub fn pwrite(file: &File, offset: u64, data: &[u8]) -> Result<()> {
    use std::os::windows::fs::FileExt;
    file.seek_write(data, offset)
        .map(|_| ())
        .map_err(|e| Error::PositionalWrite { offset, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn create_sparse_file_has_requested_length() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.img");
        let file = create_sparse_file(&path, 1 << 20)?;
        drop(file);
        assert_eq!(std::fs::metadata(&path)?.len(), 1 << 20);
        Ok(())
    }

    #[test]
    fn pwrite_places_bytes_at_offset_without_disturbing_rest() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.img");
        let file = create_sparse_file(&path, 4096)?;
        pwrite(&file, 100, b"hello")?;
        drop(file);

        let mut buf = Vec::new();
        std::fs::File::open(&path)?.read_to_end(&mut buf)?;
        assert_eq!(&buf[100..105], b"hello");
        assert_eq!(buf.len(), 4096);
        Ok(())
    }
}
