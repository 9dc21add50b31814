//! CPU core counting.

use crate::config::{ENV_NBTHREADS, NB_THREADS_MAX};

/// Returns the number of logical CPU cores available on the system.
///
/// Guaranteed to return a value ≥ 1.
pub fn count_cores() -> usize {
    num_cpus::get().max(1)
}

/// Default decode/encode worker count: `MTDEC_NBTHREADS` when it holds a
/// positive integer, otherwise the core count. Always within
/// `1..=NB_THREADS_MAX`.
pub fn default_nb_threads() -> usize {
    let from_env = std::env::var(ENV_NBTHREADS)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(count_cores).clamp(1, NB_THREADS_MAX)
}
