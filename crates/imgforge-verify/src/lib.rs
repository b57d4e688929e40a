//! GPG signature verification and checksum verification over an isolated,
//! scoped keyring.
//!
//! # Architecture
//!
//! - `hasher` - streaming digest trait and SHA-256/512 implementations
//! - `checksum` - checksum kind and comparison
//! - `keyring` - the trust anchor a repository source carries
//! - `trust` - [`TrustChain`], the component that ties both together

mod checksum;
mod error;
mod hasher;
mod keyring;
mod trust;

pub use checksum::{verify_checksum, verify_checksums, Checksum, ChecksumKind};
pub use error::{Result, TrustError};
pub use hasher::{Hasher, Sha256Hasher, Sha512Hasher};
pub use keyring::KeyDescriptor;
pub use trust::TrustChain;
