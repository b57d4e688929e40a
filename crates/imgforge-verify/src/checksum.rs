use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, TrustError};
use crate::hasher::{Hasher, Sha256Hasher, Sha512Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Sha256,
    Sha512,
}

impl ChecksumKind {
    fn label(self) -> &'static str {
        match self {
            ChecksumKind::Sha256 => "sha256",
            ChecksumKind::Sha512 => "sha512",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Checksum {
    pub kind: ChecksumKind,
    pub hex: String,
}

fn digest_file(kind: ChecksumKind, path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 64 * 1024];
    match kind {
        ChecksumKind::Sha256 => {
            let mut hasher = Sha256Hasher::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize())
        }
        ChecksumKind::Sha512 => {
            let mut hasher = Sha512Hasher::new();
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize())
        }
    }
}

/// Verify a single checksum against `file`, case-insensitively.
pub fn verify_checksum(kind: ChecksumKind, expected_hex: &str, file: &Path) -> Result<()> {
    let actual = digest_file(kind, file)?;
    let actual_hex = hex::encode(&actual);
    if actual_hex.eq_ignore_ascii_case(expected_hex) {
        Ok(())
    } else {
        Err(TrustError::ChecksumMismatch {
            kind: kind.label(),
            expected: expected_hex.to_string(),
            actual: actual_hex,
        })
    }
}

/// Verify every checksum in `list` against `file`; all must match. An entry
/// with both a SHA-256 and a SHA-512 checksum is fully authoritative only
/// when both agree.
pub fn verify_checksums(list: &[Checksum], file: &Path) -> Result<()> {
    for checksum in list {
        verify_checksum(checksum.kind, &checksum.hex, file)?;
    }
    Ok(())
}
