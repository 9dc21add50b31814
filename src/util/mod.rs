//! Small helpers shared by the engine, the encoder and the CLI.
//!
//! - [`cores`] — CPU core counting and the default worker count
//! - [`io`]    — short-read tolerant reads and human-readable sizes

pub mod cores;
pub mod io;

// ── Re-exports at `util::` level ─────────────────────────────────────────────

pub use cores::{count_cores, default_nb_threads};
pub use io::{format_size, parse_size, read_to_capacity};

// ── Size units ───────────────────────────────────────────────────────────────

pub const KB: usize = 1 << 10;
pub const MB: usize = 1 << 20;
pub const GB: usize = 1 << 30;
