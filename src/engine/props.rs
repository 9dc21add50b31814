//! Caller-facing configuration, statistics and the progress hook.

use crate::config::{
    IN_BUF_SIZE_DEFAULT, IN_BUF_SIZE_MAX, IN_BUF_SIZE_MIN, MEM_USE_MAX_DEFAULT, NB_THREADS_MAX,
};
use crate::util::default_nb_threads;

use super::state::{CollapseReason, EngineState};

/// Tuning for one [`decode_mt`](super::decode_mt) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtDecProps {
    /// Size of each input chunk read from the source.
    pub in_buf_size: usize,
    /// Upper bound on worker threads; 1 decodes on the calling thread.
    pub num_threads_max: usize,
    /// Ceiling on memory held by in-flight blocks (input chunks + decoded
    /// output). A block that cannot fit makes the engine finish the stream
    /// with one thread.
    pub mem_use_max: u64,
    /// Stop writing once this many decoded bytes reached the output.
    pub out_size_limit: Option<u64>,
}

impl Default for MtDecProps {
    fn default() -> Self {
        MtDecProps {
            in_buf_size: IN_BUF_SIZE_DEFAULT,
            num_threads_max: default_nb_threads(),
            mem_use_max: MEM_USE_MAX_DEFAULT,
            out_size_limit: None,
        }
    }
}

impl MtDecProps {
    /// Sets the thread limit, clamped to `1..=NB_THREADS_MAX`. Returns the
    /// value stored.
    pub fn set_num_threads(&mut self, n: usize) -> usize {
        self.num_threads_max = n.clamp(1, NB_THREADS_MAX);
        self.num_threads_max
    }

    /// Sets the input chunk size, clamped to the accepted range. Returns the
    /// value stored.
    pub fn set_in_buf_size(&mut self, size: usize) -> usize {
        self.in_buf_size = size.clamp(IN_BUF_SIZE_MIN, IN_BUF_SIZE_MAX);
        self.in_buf_size
    }

    pub(crate) fn effective_threads(&self) -> usize {
        self.num_threads_max.clamp(1, NB_THREADS_MAX)
    }

    pub(crate) fn effective_in_buf_size(&self) -> usize {
        self.in_buf_size.clamp(IN_BUF_SIZE_MIN, IN_BUF_SIZE_MAX)
    }
}

/// What a run did. Filled in whether it succeeded or not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// More than one worker thread took part.
    pub multi_thread_used: bool,
    pub threads_started: usize,
    /// Raw input bytes of the blocks that reached the output.
    pub bytes_in: u64,
    /// Decoded bytes accepted by the sink.
    pub bytes_out: u64,
    /// Blocks written to the output.
    pub blocks: u64,
    /// Output stopped at `out_size_limit`.
    pub truncated: bool,
    /// Why multi-thread decoding handed over to one thread, if it did.
    pub fallback: Option<CollapseReason>,
    /// Highest memory charge of in-flight blocks.
    pub peak_memory: u64,
    pub final_state: EngineState,
}

/// Progress hook, called in block order after each written block with the
/// decoded (input, output) totals. Returning `false` stops the run with
/// [`MtDecError::ProgressCancel`](crate::MtDecError::ProgressCancel).
pub trait Progress {
    fn progress(&mut self, in_size: u64, out_size: u64) -> bool;
}

impl<F> Progress for F
where
    F: FnMut(u64, u64) -> bool,
{
    fn progress(&mut self, in_size: u64, out_size: u64) -> bool {
        self(in_size, out_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_clamp() {
        let mut p = MtDecProps::default();
        assert_eq!(p.set_num_threads(0), 1);
        assert_eq!(p.set_num_threads(10_000), NB_THREADS_MAX);
        assert_eq!(p.set_in_buf_size(1), IN_BUF_SIZE_MIN);
    }

    #[test]
    fn effective_values_clamp_raw_fields() {
        let p = MtDecProps { in_buf_size: 0, num_threads_max: 0, ..Default::default() };
        assert_eq!(p.effective_threads(), 1);
        assert_eq!(p.effective_in_buf_size(), IN_BUF_SIZE_MIN);
    }

    #[test]
    fn closure_is_progress() {
        let mut calls = 0;
        let mut f = |_i: u64, o: u64| {
            calls += 1;
            o < 10
        };
        assert!(f.progress(1, 5));
        assert!(!f.progress(2, 20));
        assert_eq!(calls, 2);
    }
}
