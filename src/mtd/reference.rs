//! Straight-line MTD decoder over an in-memory buffer.
//!
//! Shares no code path with the engine beyond the header definitions, which
//! makes it a useful oracle in tests and fuzzing.

use crate::error::{MtDecError, Result};
use crate::xxhash::{content_hasher, xxh32_oneshot, MTD_SEED};

use super::format::{
    read_u32_le, BlockHeader, FrameHeader, Method, BLOCK_HEADER_SIZE, CHECKSUM_SIZE, END_MARK,
    FRAME_HEADER_SIZE,
};
use super::rle::RleDecoder;

fn take<'d>(data: &'d [u8], pos: &mut usize, n: usize) -> Result<&'d [u8]> {
    let end = pos.checked_add(n).filter(|&e| e <= data.len()).ok_or(MtDecError::InputEof)?;
    let s = &data[*pos..end];
    *pos = end;
    Ok(s)
}

/// Decodes every concatenated frame in `data`.
pub fn decode_frame_to_vec(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let header = FrameHeader::decode(take(data, &mut pos, FRAME_HEADER_SIZE)?)?;
        let frame_start = out.len();
        loop {
            if *data.get(pos).ok_or(MtDecError::InputEof)? == END_MARK {
                pos += 1;
                break;
            }
            let h = BlockHeader::decode(take(data, &mut pos, BLOCK_HEADER_SIZE)?)?;
            let payload = take(data, &mut pos, h.packed_size as usize)?;
            let start = out.len();
            match h.method {
                Method::Stored => out.extend_from_slice(payload),
                Method::Rle => {
                    let mut rle = RleDecoder::default();
                    rle.decode(payload, &mut out, start + h.unpacked_size as usize)?;
                }
            }
            if out.len() - start != h.unpacked_size as usize {
                return Err(MtDecError::data("block size mismatch"));
            }
            if xxh32_oneshot(&out[start..], MTD_SEED) != h.checksum {
                return Err(MtDecError::data("block checksum mismatch"));
            }
        }
        if header.content_checksum() {
            let expected = read_u32_le(take(data, &mut pos, CHECKSUM_SIZE)?);
            let mut hasher = content_hasher();
            hasher.update(&out[frame_start..]);
            if hasher.digest() != expected {
                return Err(MtDecError::data("content checksum mismatch"));
            }
        }
        if pos == data.len() {
            return Ok(out);
        }
    }
}
