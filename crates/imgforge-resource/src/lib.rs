//! Shared data model: repository sources, index entries, revisions, and the
//! planner's tag sets. No I/O lives here — only the types and invariants
//! spec §3 describes.

mod arch;
mod entry;
mod revision;
mod source;
mod tagset;

pub use arch::Arch;
pub use entry::{IndexEntry, Note};
pub use revision::Revision;
pub use source::{FormatTag, RepoSource};
pub use tagset::{Goal, TagSet};

pub use imgforge_verify::{Checksum, ChecksumKind};
