//! Thin wrapper around the `xxhash-rust` crate providing the XXH32 API used
//! by the MTD codec for per-block and whole-frame checksums.

pub use xxhash_rust::xxh32::Xxh32 as Xxh32State;

/// Seed used for every checksum in the MTD format.
pub const MTD_SEED: u32 = 0;

/// One-shot XXH32 hash.
///
/// # Parity vectors
/// * `xxh32_oneshot(b"", 0)` == `0x02CC5D05`
#[inline]
pub fn xxh32_oneshot(data: &[u8], seed: u32) -> u32 {
    xxhash_rust::xxh32::xxh32(data, seed)
}

/// Fresh streaming state seeded for the MTD format.
#[inline]
pub fn content_hasher() -> Xxh32State {
    Xxh32State::new(MTD_SEED)
}
