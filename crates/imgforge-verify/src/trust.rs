use std::path::{Path, PathBuf};

use imgforge_fs::ScopedDir;
use imgforge_platform::Command;
use tracing::{debug, instrument};

use crate::checksum::{verify_checksum as verify_checksum_file, verify_checksums as verify_checksums_file, Checksum, ChecksumKind};
use crate::error::{Result, TrustError};
use crate::keyring::KeyDescriptor;

/// GPG signature verification and checksum verification against an
/// isolated, scoped keyring.
///
/// When `check_signature` is false at construction the instance is a no-op:
/// every `verify*` call succeeds without touching gpg. This mirrors the
/// original tool's `--no-check-signature` escape hatch.
pub struct TrustChain {
    gpg_path: String,
    fingerprint: Option<String>,
    check_signature: bool,
    keyring: Option<ScopedDir>,
}

fn normalize_fingerprint(fp: &str) -> String {
    fp.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_uppercase()
}

impl TrustChain {
    /// Construct a trust chain. `scratch_dir` is the parent directory under
    /// which the scoped keyring is created (its removal is guaranteed by
    /// [`ScopedDir`] on every exit path).
    #[instrument(skip(gpg_path, scratch_dir))]
    pub fn new(
        gpg_path: impl Into<String>,
        key: KeyDescriptor,
        check_signature: bool,
        scratch_dir: &Path,
    ) -> Result<Self> {
        let gpg_path = gpg_path.into();

        if !check_signature {
            debug!("signature checking disabled; trust chain is a no-op");
            return Ok(Self { gpg_path, fingerprint: None, check_signature: false, keyring: None });
        }

        let keyring = ScopedDir::new_in(scratch_dir, "keyring")?;

        let fingerprint = match key {
            KeyDescriptor::NoKey => None,
            KeyDescriptor::Fingerprint(fp) => {
                Self::export_into_keyring(&gpg_path, keyring.path(), &fp)?;
                Some(normalize_fingerprint(&fp))
            }
            KeyDescriptor::KeyFile(path) => Some(Self::import_key_file(&gpg_path, keyring.path(), &path)?),
        };

        Ok(Self { gpg_path, fingerprint, check_signature: true, keyring: Some(keyring) })
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.gpg_path).arg("--status-fd").arg("1").arg("--batch").arg("--no-tty");
        if let Some(keyring) = &self.keyring {
            cmd = cmd.arg("--homedir").arg(keyring.path());
        }
        cmd
    }

    fn export_into_keyring(gpg_path: &str, keyring_dir: &Path, fingerprint: &str) -> Result<()> {
        let exported = Command::new(gpg_path).arg("--export").arg(fingerprint).run()?;
        Command::new(gpg_path)
            .arg("--homedir")
            .arg(keyring_dir)
            .arg("--import")
            .run_with_stdin(&exported.stdout)?;
        Ok(())
    }

    fn import_key_file(gpg_path: &str, keyring_dir: &Path, key_file: &Path) -> Result<String> {
        let output = Command::new(gpg_path)
            .arg("--status-fd")
            .arg("1")
            .arg("--homedir")
            .arg(keyring_dir)
            .arg("--import")
            .arg(key_file)
            .run()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_import_fingerprint(&stdout).ok_or_else(|| TrustError::SignatureInvalid {
            file: key_file.to_path_buf(),
            reason: "gpg --import produced no IMPORT_OK status line".to_string(),
        })
    }

    fn check_fingerprint(&self, status: &str, file: &Path) -> Result<()> {
        let Some(actual) = parse_validsig_fingerprint(status) else {
            return Err(TrustError::SignatureInvalid {
                file: file.to_path_buf(),
                reason: "no VALIDSIG status line".to_string(),
            });
        };
        if let Some(expected) = &self.fingerprint
            && !actual.eq_ignore_ascii_case(expected)
        {
            return Err(TrustError::FingerprintMismatch { configured: expected.clone(), actual });
        }
        Ok(())
    }

    /// Verify an inline (clearsigned or appended-signature) file.
    pub fn verify(&self, file: &Path) -> Result<()> {
        if !self.check_signature {
            return Ok(());
        }
        let output = self.base_command().arg("--verify").arg(file).run()?;
        let status = String::from_utf8_lossy(&output.stdout);
        self.check_fingerprint(&status, file)
    }

    /// Verify `file` against a detached signature. `sig_file` must be
    /// present when signature checking is enabled.
    pub fn verify_detached(&self, file: &Path, sig_file: Option<&Path>) -> Result<()> {
        if !self.check_signature {
            return Ok(());
        }
        let Some(sig_file) = sig_file else {
            return Err(TrustError::MissingDetachedSignature { file: file.to_path_buf() });
        };
        let output = self.base_command().arg("--verify").arg(sig_file).arg(file).run()?;
        let status = String::from_utf8_lossy(&output.stdout);
        self.check_fingerprint(&status, file)
    }

    /// Verify an inline-signed file and strip the signature wrapper,
    /// returning the path to the unsigned content. Returns `None` when
    /// signature checking is disabled (the caller should use `file` as-is).
    pub fn verify_and_remove_signature(&self, file: &Path) -> Result<Option<PathBuf>> {
        if !self.check_signature {
            return Ok(None);
        }
        let keyring = self.keyring.as_ref().expect("keyring present when check_signature is true");
        let unsigned = keyring.path().join("unsigned");
        let output = self
            .base_command()
            .arg("--output")
            .arg(&unsigned)
            .arg("--decrypt")
            .arg(file)
            .run()?;
        let status = String::from_utf8_lossy(&output.stdout);
        self.check_fingerprint(&status, file)?;
        Ok(Some(unsigned))
    }

    /// Verify a single checksum against `file`.
    pub fn verify_checksum(&self, kind: ChecksumKind, expected_hex: &str, file: &Path) -> Result<()> {
        if !self.check_signature {
            return Ok(());
        }
        verify_checksum_file(kind, expected_hex, file)
    }

    /// Verify every checksum an index entry carries against `file`.
    pub fn verify_checksums(&self, checksums: &[Checksum], file: &Path) -> Result<()> {
        if !self.check_signature {
            return Ok(());
        }
        verify_checksums_file(checksums, file)
    }

    pub fn is_noop(&self) -> bool { !self.check_signature }
}

fn parse_import_fingerprint(status: &str) -> Option<String> {
    for line in status.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("[GNUPG:]") {
            continue;
        }
        if fields.next() == Some("IMPORT_OK") {
            fields.next(); // reason code
            if let Some(fp) = fields.next() {
                return Some(normalize_fingerprint(fp));
            }
        }
    }
    None
}

fn parse_validsig_fingerprint(status: &str) -> Option<String> {
    for line in status.lines() {
        let mut fields = line.split_whitespace();
        if fields.next() != Some("[GNUPG:]") {
            continue;
        }
        if fields.next() == Some("VALIDSIG")
            && let Some(fp) = fields.next()
        {
            return Some(normalize_fingerprint(fp));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_import_ok_status_line() {
        let status = "[GNUPG:] IMPORT_OK 1 AAAA1111BBBB2222CCCC3333DDDD4444EEEE5555\n";
        assert_eq!(
            parse_import_fingerprint(status),
            Some("AAAA1111BBBB2222CCCC3333DDDD4444EEEE5555".to_string())
        );
    }

    #[test]
    fn parses_validsig_status_line() {
        let status = "[GNUPG:] VALIDSIG aaaa1111bbbb2222cccc3333dddd4444eeee5555 2024-01-01 1 4 0 1 8 00 AAAA\n";
        assert_eq!(
            parse_validsig_fingerprint(status),
            Some("AAAA1111BBBB2222CCCC3333DDDD4444EEEE5555".to_string())
        );
    }

    #[test]
    fn missing_status_lines_yield_none() {
        assert_eq!(parse_validsig_fingerprint("nothing useful\n"), None);
    }

    #[test]
    fn no_op_trust_chain_accepts_anything() {
        let dir = tempfile::tempdir().unwrap();
        let chain = TrustChain::new("gpg", KeyDescriptor::NoKey, false, dir.path()).unwrap();
        assert!(chain.is_noop());
        let file = dir.path().join("f");
        std::fs::write(&file, b"data").unwrap();
        assert!(chain.verify(&file).is_ok());
        assert!(chain.verify_detached(&file, None).is_ok());
        assert_eq!(chain.verify_and_remove_signature(&file).unwrap(), None);
    }
}
