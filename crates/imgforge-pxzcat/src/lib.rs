//! Parallel `.xz` decompression for disk-image templates (spec §4.7).
//!
//! A template's `.xz` container is read back to front: the stream footer
//! locates the index, the index gives every block's compressed and
//! uncompressed size, and those sizes let every block be decoded
//! independently and written to its final offset in one sparse output file.
//! With the `lzma` feature (the default), decoding happens in-process via
//! liblzma's raw decoder spread across a thread pool; without it, the crate
//! falls back to shelling out to the external `xzcat` binary.

mod block;
#[cfg(feature = "lzma")]
mod decode;
mod error;
mod format;
mod index;
mod pxzcat;

pub use error::{Error, Result};
pub use format::{align_up, decode_vli, encode_vli};
pub use pxzcat::{pxzcat, pxzcat_with_workers};
