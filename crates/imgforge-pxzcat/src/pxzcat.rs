//! Top-level entry point: validate the stream header, build the combined
//! block index, create the sparse output file, and fan block decoding out
//! across worker threads sharing one mutex-guarded block iterator (spec
//! §4.7).

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::{Error, Result};
use crate::format::STREAM_HEADER_MAGIC;
use crate::index::scan_streams;

/// Uncompress `input`, a well-formed `.xz` stream, into `output` as a
/// sparse regular file of exactly the decompressed size, using up to
/// `worker_count` threads (typically [`num_cpus::get`]).
#[instrument(skip(input, output), fields(input = %input.display(), output = %output.display()))]
pub fn pxzcat(input: &Path, output: &Path) -> Result<()> {
    pxzcat_with_workers(input, output, num_cpus::get().max(1))
}

pub fn pxzcat_with_workers(input: &Path, output: &Path, worker_count: usize) -> Result<()> {
    let data = std::fs::read(input)?;
    if data.len() < STREAM_HEADER_MAGIC.len() || data[..STREAM_HEADER_MAGIC.len()] != STREAM_HEADER_MAGIC {
        return Err(Error::BadMagic { path: input.to_path_buf() });
    }

    let (blocks, total_size) = scan_streams(&data)?;
    debug!(blocks = blocks.len(), total_size, "resolved combined block index");

    let out_file = imgforge_fs::create_sparse_file(output, total_size)?;

    decode_all(input, &out_file, blocks, worker_count)?;
    info!(total_size, "decompression complete");
    Ok(())
}

#[cfg(feature = "lzma")]
fn decode_all(
    input: &Path,
    out_file: &std::fs::File,
    blocks: Vec<crate::index::Block>,
    worker_count: usize,
) -> Result<()> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    let in_file = std::fs::File::open(input)?;
    let iter = Mutex::new(blocks.into_iter());
    let failed: Mutex<Option<Error>> = Mutex::new(None);
    let any_failed = AtomicBool::new(false);

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let iter = &iter;
            let in_file = &in_file;
            let out_file = &out_file;
            let failed = &failed;
            let any_failed = &any_failed;
            scope.spawn(move || {
                loop {
                    if any_failed.load(Ordering::Relaxed) {
                        return;
                    }
                    let block = {
                        let mut guard = iter.lock().unwrap();
                        guard.next()
                    };
                    let Some(block) = block else { return };
                    if let Err(e) = crate::decode::decode_block(in_file, out_file, &block) {
                        any_failed.store(true, Ordering::Relaxed);
                        *failed.lock().unwrap() = Some(e);
                        return;
                    }
                }
            });
        }
    });

    if let Some(e) = failed.into_inner().unwrap() {
        return Err(e);
    }
    Ok(())
}

/// Without liblzma bindings available, fall back to the external `xzcat`
/// tool, redirecting its stdout into the output file directly. The block
/// index is only needed to size the sparse output file ahead of time, so
/// it's discarded here rather than consulted.
#[cfg(not(feature = "lzma"))]
fn decode_all(
    input: &Path,
    out_file: &std::fs::File,
    _blocks: Vec<crate::index::Block>,
    _worker_count: usize,
) -> Result<()> {
    use std::process::Stdio;
    imgforge_platform::Command::new("xzcat")
        .arg(input)
        .stdout_to(Stdio::from(out_file.try_clone()?))
        .run()?;
    Ok(())
}
