// config.rs — Compile-time configuration constants for the decode engine,
// the reference MTD codec and the `mtdec` command-line tool.
//
// Runtime overrides: the CLI reads MTDEC_NBTHREADS from the environment and
// the -T / --in-buf / --mem-limit / -B flags; library users set the fields of
// `MtDecProps` / `EncodeProps` directly.

use crate::util::{KB, MB};

// Hard upper bound on worker slots in the token ring.
// A request for more threads is clamped to this value.
pub const NB_THREADS_MAX: usize = 32;

// Default number of decode threads (0 = auto-detect from the CPU count).
pub const NB_THREADS_DEFAULT: usize = 0;

// Default size of one input chunk read by a worker.
pub const IN_BUF_SIZE_DEFAULT: usize = MB;

// Smallest accepted input chunk. Tiny buffers are legal (they only cost
// throughput) and are what the tests use to force headers and block
// boundaries to straddle chunk edges.
pub const IN_BUF_SIZE_MIN: usize = 16;

// Largest accepted input chunk.
pub const IN_BUF_SIZE_MAX: usize = 64 * MB;

// Default memory ceiling for all in-flight input chunks and output buffers.
pub const MEM_USE_MAX_DEFAULT: u64 = 1 << 30;

// Default uncompressed block size produced by the encoder.
pub const BLOCK_SIZE_DEFAULT: usize = MB;

// Smallest block size accepted by the encoder.
pub const BLOCK_SIZE_MIN: usize = KB;

// Largest uncompressed block the MTD format allows.
pub const BLOCK_SIZE_MAX: usize = 64 * MB;

// Environment variable consulted by the CLI for the default thread count.
pub const ENV_NBTHREADS: &str = "MTDEC_NBTHREADS";
