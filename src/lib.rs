// mtdec — multithreaded streaming block decoder

pub mod config;
pub mod display;
pub mod error;
pub mod util;
pub mod xxhash;
pub mod engine;
pub mod mtd;
pub mod cli;

// ── Version constants ────────────────────────────────────────────────────────
pub const MTDEC_VERSION_MAJOR: u32 = 0;
pub const MTDEC_VERSION_MINOR: u32 = 3;
pub const MTDEC_VERSION_RELEASE: u32 = 0;
pub const MTDEC_VERSION_NUMBER: u32 =
    MTDEC_VERSION_MAJOR * 100 * 100 + MTDEC_VERSION_MINOR * 100 + MTDEC_VERSION_RELEASE;
pub const MTDEC_VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

/// Returns the runtime version number.
pub fn version_number() -> u32 {
    MTDEC_VERSION_NUMBER
}

/// Returns the runtime version string.
pub fn version_string() -> &'static str {
    MTDEC_VERSION_STRING
}

pub use engine::{
    decode_mt, BlockCodec, BlockDescriptor, BlockStatus, CodeProgress, CodeStatus,
    CollapseReason, DecodeStats, EngineState, MtDecProps, ParseInfo, ParseOutcome, ParseState,
    Progress, WriteOutcome, WriteRequest,
};
pub use error::{ErrorKind, MtDecError, Result};
pub use mtd::{decode_frame_to_vec, encode_mt, encode_to_vec, EncodeProps, Method, MtdCodec};
