// format.rs — MTD frame layout.
//
//   frame    := header block* end
//   header   := magic:u32le ("MTD1") flags:u8
//   block    := method:u8 packed:u32le unpacked:u32le xxh32:u32le payload[packed]
//   end      := 0x00 [content_xxh32:u32le]   (present when FLAG_CONTENT_CHECKSUM)
//
// `xxh32` is the checksum of the block's decoded bytes; the content checksum
// covers the decoded bytes of the whole frame. Frames may be concatenated.

use crate::config::BLOCK_SIZE_MAX;
use crate::error::{MtDecError, Result};

pub const MAGIC: u32 = 0x3144_544D;
pub const FRAME_HEADER_SIZE: usize = 5;
pub const BLOCK_HEADER_SIZE: usize = 13;
pub const END_MARK: u8 = 0x00;
pub const CHECKSUM_SIZE: usize = 4;

pub const FLAG_CONTENT_CHECKSUM: u8 = 0x01;
const FLAGS_KNOWN: u8 = FLAG_CONTENT_CHECKSUM;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Method {
    Stored = 1,
    Rle = 2,
}

impl Method {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(Method::Stored),
            2 => Some(Method::Rle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Stored => "stored",
            Method::Rle => "rle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub flags: u8,
}

impl FrameHeader {
    pub fn new(content_checksum: bool) -> Self {
        FrameHeader { flags: if content_checksum { FLAG_CONTENT_CHECKSUM } else { 0 } }
    }

    pub fn content_checksum(&self) -> bool {
        self.flags & FLAG_CONTENT_CHECKSUM != 0
    }

    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut b = [0u8; FRAME_HEADER_SIZE];
        b[..4].copy_from_slice(&MAGIC.to_le_bytes());
        b[4] = self.flags;
        b
    }

    pub fn decode(b: &[u8]) -> Result<Self> {
        if b.len() < FRAME_HEADER_SIZE {
            return Err(MtDecError::data("frame header truncated"));
        }
        let magic = read_u32_le(&b[..4]);
        if magic != MAGIC {
            return Err(MtDecError::data(format!("bad frame magic 0x{:08X}", magic)));
        }
        let flags = b[4];
        if flags & !FLAGS_KNOWN != 0 {
            return Err(MtDecError::data(format!("unknown frame flags 0x{:02X}", flags)));
        }
        Ok(FrameHeader { flags })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub method: Method,
    pub packed_size: u32,
    pub unpacked_size: u32,
    pub checksum: u32,
}

impl BlockHeader {
    pub fn encode(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut b = [0u8; BLOCK_HEADER_SIZE];
        b[0] = self.method as u8;
        b[1..5].copy_from_slice(&self.packed_size.to_le_bytes());
        b[5..9].copy_from_slice(&self.unpacked_size.to_le_bytes());
        b[9..13].copy_from_slice(&self.checksum.to_le_bytes());
        b
    }

    /// Decodes and validates a block header. `b[0]` must not be the end mark.
    pub fn decode(b: &[u8]) -> Result<Self> {
        if b.len() < BLOCK_HEADER_SIZE {
            return Err(MtDecError::data("block header truncated"));
        }
        let method = Method::from_u8(b[0])
            .ok_or_else(|| MtDecError::data(format!("unknown block method {}", b[0])))?;
        let h = BlockHeader {
            method,
            packed_size: read_u32_le(&b[1..5]),
            unpacked_size: read_u32_le(&b[5..9]),
            checksum: read_u32_le(&b[9..13]),
        };
        h.validate()?;
        Ok(h)
    }

    fn validate(&self) -> Result<()> {
        let packed = self.packed_size as u64;
        let unpacked = self.unpacked_size as u64;
        if unpacked == 0 {
            return Err(MtDecError::data("empty data block"));
        }
        if unpacked > BLOCK_SIZE_MAX as u64 {
            return Err(MtDecError::data(format!("block size {} exceeds format maximum", unpacked)));
        }
        let ok = match self.method {
            Method::Stored => packed == unpacked,
            // One (run, byte) pair expands to 1..=256 bytes.
            Method::Rle => packed % 2 == 0 && packed >= 2 && packed <= 2 * unpacked,
        };
        if !ok {
            return Err(MtDecError::data(format!(
                "{} block: inconsistent sizes {} / {}",
                self.method.name(),
                packed,
                unpacked
            )));
        }
        Ok(())
    }
}

#[inline]
pub fn read_u32_le(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}
