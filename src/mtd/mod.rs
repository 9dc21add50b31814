//! MTD: a small checksummed block format used as the engine's reference codec.
//!
//! - [`format`]    — frame / block header layout
//! - [`rle`]       — run-length payload coding
//! - [`decoder`]   — [`MtdCodec`], the `BlockCodec` the engine drives
//! - [`encoder`]   — multi-threaded frame encoder
//! - [`reference`] — single-pass in-memory decoder used as a test oracle

pub mod decoder;
pub mod encoder;
pub mod format;
pub mod reference;
pub mod rle;

pub use decoder::{FrameParser, FrameWriter, MtdCodec, MtdCoder};
pub use encoder::{encode_block, encode_mt, encode_to_vec, EncodeProps, EncodeStats, FrameBuilder};
pub use format::{BlockHeader, FrameHeader, Method};
pub use reference::decode_frame_to_vec;
