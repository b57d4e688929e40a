//! Block header parsing (spec §4.7 step 4): the header-size byte locates
//! the header, after which a flags byte and a compact filter-flags list
//! describe the filter chain the block's compressed data was encoded with.
//! This component only decodes the LZMA2 filter, the only filter the
//! transformation pipeline ever produces templates with.

use crate::error::{Error, Result};
use crate::format::{decode_vli, lzma2_dict_size};

/// Everything needed to build a matching raw LZMA2 decoder and locate a
/// block's compressed payload within the input file.
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    /// Size of the block header itself, in bytes (the real xz block header,
    /// not the surrounding block).
    pub header_size: u64,
    pub dict_size: u32,
}

const FILTER_ID_LZMA2: u64 = 0x21;

/// Parse the block header starting at `data[0]`. `data` must contain at
/// least the full header (its size is self-describing via the first byte).
pub fn parse_block_header(data: &[u8], offset: u64) -> Result<BlockHeader> {
    let bad = |reason: &str| Error::BadBlockHeader { offset, reason: reason.to_string() };

    let size_byte = *data.first().ok_or_else(|| bad("empty block"))?;
    if size_byte == 0 {
        return Err(bad("index indicator byte found where a block header was expected"));
    }
    let header_size = (size_byte as u64 + 1) * 4;
    if (data.len() as u64) < header_size {
        return Err(bad("truncated block header"));
    }

    let flags = *data.get(1).ok_or_else(|| bad("missing block flags byte"))?;
    let num_filters = (flags & 0x03) + 1;
    let has_compressed_size = flags & 0x40 != 0;
    let has_uncompressed_size = flags & 0x80 != 0;

    let mut pos = 2usize;
    if has_compressed_size {
        let (_, consumed) = decode_vli(&data[pos..]).ok_or_else(|| bad("unparsable compressed size field"))?;
        pos += consumed;
    }
    if has_uncompressed_size {
        let (_, consumed) = decode_vli(&data[pos..]).ok_or_else(|| bad("unparsable uncompressed size field"))?;
        pos += consumed;
    }

    let mut dict_size = None;
    for _ in 0..num_filters {
        let (filter_id, c1) = decode_vli(&data[pos..]).ok_or_else(|| bad("unparsable filter id"))?;
        pos += c1;
        let (props_size, c2) = decode_vli(&data[pos..]).ok_or_else(|| bad("unparsable filter properties size"))?;
        pos += c2;
        let props = &data[pos..pos + props_size as usize];
        pos += props_size as usize;

        if filter_id == FILTER_ID_LZMA2 {
            let byte = *props.first().ok_or_else(|| bad("lzma2 filter carries no properties byte"))?;
            dict_size = Some(lzma2_dict_size(byte).ok_or_else(|| bad("invalid lzma2 dictionary size byte"))?);
        }
    }

    let dict_size = dict_size.ok_or_else(|| bad("block does not use the lzma2 filter"))?;
    Ok(BlockHeader { header_size, dict_size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::encode_vli;

    fn build_header(dict_byte: u8) -> Vec<u8> {
        let mut filters = Vec::new();
        filters.extend(encode_vli(FILTER_ID_LZMA2));
        filters.extend(encode_vli(1)); // one properties byte
        filters.push(dict_byte);

        // size_byte(1) + flags(1) + filters + header padding + crc32(4),
        // rounded up so the whole header is a multiple of 4 bytes.
        let min_len = 1 + 1 + filters.len() + 4;
        let header_size = min_len.div_ceil(4) * 4;
        let size_byte = (header_size / 4 - 1) as u8;

        let mut header = vec![size_byte, 0x00]; // flags: 1 filter, no optional sizes
        header.extend(&filters);
        while header.len() < header_size - 4 {
            header.push(0); // header padding
        }
        header.extend([0u8; 4]); // placeholder CRC32, not checked
        header
    }

    #[test]
    fn parses_a_single_lzma2_filter_header() {
        let header = build_header(0);
        let parsed = parse_block_header(&header, 0).unwrap();
        assert_eq!(parsed.header_size, header.len() as u64);
        assert_eq!(parsed.dict_size, 1 << 12);
    }

    #[test]
    fn rejects_a_header_with_no_filters_matching_lzma2() {
        let mut header = build_header(0);
        // corrupt the filter id so it no longer matches LZMA2
        header[2] = 0x03;
        let err = parse_block_header(&header, 0).unwrap_err();
        assert!(matches!(err, Error::BadBlockHeader { .. }));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(parse_block_header(&[], 0).is_err());
    }
}
