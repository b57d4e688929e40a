//! Stream footer and index parsing, and the backward-from-EOF scan that
//! combines every stream in a (possibly multi-stream, padded) `.xz` file
//! into one flat block index (spec §4.7 step 2).

use crate::error::{Error, Result};
use crate::format::{align_up, decode_vli, STREAM_FOOTER_MAGIC, STREAM_FOOTER_SIZE, STREAM_HEADER_SIZE};

/// One block's position in both the compressed input and the decompressed
/// output, derived from the stream's index records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Byte offset of the block's header in the input file.
    pub compressed_offset: u64,
    /// Size of the block (header + compressed data + padding + check),
    /// i.e. the index record's "unpadded size" rounded up to 4 bytes.
    pub compressed_size: u64,
    /// Byte offset this block's decompressed data starts at in the output.
    pub uncompressed_offset: u64,
    pub uncompressed_size: u64,
}

/// A stream footer: backward_size locates the index that precedes it.
struct Footer {
    backward_size: u64,
}

fn parse_footer(bytes: &[u8; 12]) -> Result<Footer> {
    if bytes[10..12] != STREAM_FOOTER_MAGIC {
        return Err(Error::BadFooter { reason: "footer magic mismatch".to_string() });
    }
    let backward_size_field = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let backward_size = (backward_size_field as u64 + 1) * 4;
    Ok(Footer { backward_size })
}

/// Parse an index block: a sequence of `(unpadded_size, uncompressed_size)`
/// VLI pairs, a count-prefix, and padding to a 4-byte boundary (CRC32 not
/// re-verified here; the block decoder is the authoritative integrity
/// check for this component's purposes).
fn parse_index(bytes: &[u8]) -> Result<Vec<(u64, u64)>> {
    if bytes.is_empty() || bytes[0] != 0x00 {
        return Err(Error::BadIndex { reason: "index indicator byte missing".to_string() });
    }
    let mut pos = 1;
    let (count, consumed) = decode_vli(&bytes[pos..])
        .ok_or_else(|| Error::BadIndex { reason: "unparsable record count".to_string() })?;
    pos += consumed;

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let (unpadded, c1) = decode_vli(&bytes[pos..])
            .ok_or_else(|| Error::BadIndex { reason: "unparsable unpadded size".to_string() })?;
        pos += c1;
        let (uncompressed, c2) = decode_vli(&bytes[pos..])
            .ok_or_else(|| Error::BadIndex { reason: "unparsable uncompressed size".to_string() })?;
        pos += c2;
        records.push((unpadded, uncompressed));
    }
    Ok(records)
}

/// Scan `data` from EOF backward, parsing every stream's footer and index
/// and any zero-padding between streams, returning a flat, offset-resolved
/// block list covering the whole file plus the total decompressed size.
pub fn scan_streams(data: &[u8]) -> Result<(Vec<Block>, u64)> {
    // Streams are discovered back-to-front (last stream in the file first),
    // since each stream's footer is the only thing locatable without
    // having already parsed what precedes it. Collect each stream's blocks
    // with offsets relative to that stream's own start, then assign
    // absolute uncompressed offsets in a second, forward pass once every
    // stream's total size is known.
    let mut streams_reversed: Vec<Vec<Block>> = Vec::new();
    let mut end = data.len() as u64;

    while end > 0 {
        // Skip zero-padding runs (always a multiple of 4 bytes) between
        // concatenated streams.
        let mut padding_end = end;
        while padding_end >= 4 && data[(padding_end - 4) as usize..padding_end as usize] == [0, 0, 0, 0] {
            padding_end -= 4;
        }
        end = padding_end;
        if end == 0 {
            break;
        }
        if end < STREAM_FOOTER_SIZE + STREAM_HEADER_SIZE {
            return Err(Error::BadFooter { reason: "truncated stream before footer".to_string() });
        }

        let footer_start = (end - STREAM_FOOTER_SIZE) as usize;
        let mut footer_bytes = [0u8; 12];
        footer_bytes.copy_from_slice(&data[footer_start..footer_start + 12]);
        let footer = parse_footer(&footer_bytes)?;

        let index_start = footer_start as u64 - footer.backward_size;
        let index_end = footer_start as u64;
        let records = parse_index(&data[index_start as usize..index_end as usize])?;

        // Block offsets are relative to the end of this stream's header,
        // which precedes the first block.
        let stream_header_end = index_start - records.iter().map(|(u, _)| align_up(*u, 4)).sum::<u64>();
        let mut cursor = stream_header_end;
        let mut stream_blocks = Vec::with_capacity(records.len());
        for (unpadded, uncompressed) in &records {
            stream_blocks.push(Block {
                compressed_offset: cursor,
                compressed_size: align_up(*unpadded, 4),
                uncompressed_offset: 0, // filled in below, in the forward pass
                uncompressed_size: *uncompressed,
            });
            cursor += align_up(*unpadded, 4);
        }
        streams_reversed.push(stream_blocks);

        end = stream_header_end - STREAM_HEADER_SIZE;
    }

    let mut blocks = Vec::new();
    let mut total_uncompressed = 0u64;
    for mut stream_blocks in streams_reversed.into_iter().rev() {
        for block in &mut stream_blocks {
            block.uncompressed_offset = total_uncompressed;
            total_uncompressed += block.uncompressed_size;
        }
        blocks.extend(stream_blocks);
    }

    Ok((blocks, total_uncompressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encode_vli;

    fn build_index(records: &[(u64, u64)]) -> Vec<u8> {
        let mut bytes = vec![0x00];
        bytes.extend(encode_vli(records.len() as u64));
        for (unpadded, uncompressed) in records {
            bytes.extend(encode_vli(*unpadded));
            bytes.extend(encode_vli(*uncompressed));
        }
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes
    }

    #[test]
    fn parse_index_reads_every_record() {
        let bytes = build_index(&[(100, 1000), (200, 2000)]);
        let records = parse_index(&bytes).unwrap();
        assert_eq!(records, vec![(100, 1000), (200, 2000)]);
    }

    #[test]
    fn parse_index_rejects_missing_indicator_byte() {
        let err = parse_index(&[0x01, 0x00]).unwrap_err();
        assert!(matches!(err, Error::BadIndex { .. }));
    }

    fn build_stream(records: &[(u64, u64)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend(crate::format::STREAM_HEADER_MAGIC);
        data.extend([0u8; 6]); // stream flags + crc32, not interpreted here

        for (unpadded, _) in records {
            data.extend(vec![0xAB; *unpadded as usize]);
            while data.len() % 4 != 0 {
                data.push(0);
            }
        }

        let index = build_index(records);
        let index_start = data.len();
        data.extend(&index);
        let backward_size = (data.len() - index_start) as u32 / 4 - 1;

        let mut footer = Vec::new();
        footer.extend([0u8; 4]); // crc32, not verified
        footer.extend(backward_size.to_le_bytes());
        footer.extend([0u8; 2]); // stream flags
        footer.extend(STREAM_FOOTER_MAGIC);
        data.extend(&footer);
        data
    }

    #[test]
    fn scan_streams_resolves_single_stream_block_offsets() {
        let data = build_stream(&[(16, 1000), (20, 2000)]);
        let (blocks, total) = scan_streams(&data).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(total, 3000);
        assert_eq!(blocks[0].compressed_offset, 12);
        assert_eq!(blocks[0].compressed_size, 16);
        assert_eq!(blocks[0].uncompressed_offset, 0);
        assert_eq!(blocks[1].compressed_offset, 28);
        assert_eq!(blocks[1].uncompressed_offset, 1000);
    }

    #[test]
    fn scan_streams_handles_concatenated_streams_with_padding() {
        let mut data = build_stream(&[(16, 1000)]);
        data.extend([0u8; 4]); // stream padding
        data.extend(build_stream(&[(20, 500)]));
        let (blocks, total) = scan_streams(&data).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(total, 1500);
        assert_eq!(blocks[0].uncompressed_offset, 0);
        assert_eq!(blocks[1].uncompressed_offset, 1000);
    }
}
