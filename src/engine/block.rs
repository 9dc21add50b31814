//! Per-block bookkeeping.

use crate::error::{ErrorKind, MtDecError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockStatus {
    #[default]
    Parsing,
    Parsed,
    Coded,
    Failed,
    /// Reached the sink.
    Written,
    /// Processed but kept away from the sink.
    Discarded,
}

/// One block as seen by the engine. Created by the read-token holder when it
/// claims the next index; owned by one worker from then on.
#[derive(Debug, Clone, Default)]
pub struct BlockDescriptor {
    /// Zero-based position in the stream, counting across concatenated streams.
    pub index: u64,
    /// Raw input bytes belonging to the block.
    pub in_size: u64,
    /// Decoded bytes produced by `code`.
    pub out_size: u64,
    /// Decoded size announced by the parser (0 when never announced).
    pub out_estimate: u64,
    pub status: BlockStatus,
    pub last_error: Option<ErrorKind>,
    /// The block closed its stream.
    pub is_end: bool,
    /// The block's output hit the caller's size limit.
    pub truncated: bool,
    pub can_recode: bool,
}

impl BlockDescriptor {
    pub fn new(index: u64) -> Self {
        BlockDescriptor { index, ..Default::default() }
    }

    pub(crate) fn mark_failed(&mut self, err: &MtDecError) {
        self.status = BlockStatus::Failed;
        self.last_error = Some(err.kind());
    }
}
