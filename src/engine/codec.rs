// codec.rs — The contract between the engine and a concrete block format.
//
// The engine never interprets stream bytes itself. Every format decision goes
// through one of the four stages below, each of which runs on whichever
// worker currently owns the block:
//
//   parse     — find the boundary of the next block (runs under canRead)
//   pre_code  — size the output buffer once the block's estimate is known
//   code      — decode the block's raw input into that buffer (parallel)
//   write     — emit the decoded block in order (runs under canWrite)
//
// State that must flow from one block to the next travels with the tokens:
// `ReadState` with canRead, `WriteState` with canWrite. `Coder` is per slot
// and only ever touched by the thread that owns that slot.

use std::io::Write;

use crate::error::Result;

use super::block::BlockDescriptor;

/// Outcome of a parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// The block continues past the supplied bytes.
    Continue,
    /// The block ends inside the supplied bytes; another block follows.
    NewBlock,
    /// The block is larger than the engine may buffer.
    Overflow,
    /// The block ends inside the supplied bytes and closes the stream.
    End,
}

/// Input to [`BlockCodec::parse`].
#[derive(Debug, Clone, Copy)]
pub struct ParseInfo<'a> {
    /// First call for a new block.
    pub start_call: bool,
    /// Bytes not yet seen by the parser.
    pub src: &'a [u8],
    /// No bytes follow `src` in the stream.
    pub src_finished: bool,
    /// Largest decoded block the engine can buffer, `None` when unbounded
    /// (single-thread decoding streams the block instead of buffering it).
    pub block_limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOutcome {
    pub state: ParseState,
    /// Bytes of `src` belonging to the current block. For `Continue` this
    /// must be all of `src`.
    pub consumed: usize,
    /// Decoded size of the block, once the parser knows it.
    pub out_size_estimate: Option<u64>,
}

impl ParseOutcome {
    pub fn cont(consumed: usize, out_size_estimate: Option<u64>) -> Self {
        ParseOutcome { state: ParseState::Continue, consumed, out_size_estimate }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeStatus {
    NotFinished,
    /// The block's end mark was reached; no further input belongs to it.
    FinishedWithMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeProgress {
    pub in_consumed: usize,
    pub out_produced: usize,
    pub status: CodeStatus,
}

/// Input to [`BlockCodec::write`].
pub struct WriteRequest<'a> {
    /// Ordered output. Writes past the caller's size limit are accepted and
    /// discarded.
    pub sink: &'a mut dyn Write,
    /// `false` when the block must not reach the sink (an earlier block
    /// stopped the stream, or this block failed to decode). The codec still
    /// gets the call so it can keep its own bookkeeping straight.
    pub need_write_to_stream: bool,
    /// Bytes already read past the end of an `End` block; empty otherwise
    /// or at end of input.
    pub extra: &'a [u8],
    pub block: &'a BlockDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    /// After an `End` block: another stream follows and decoding should go on.
    pub need_continue: bool,
    /// The coder still holds the block's decoded bytes intact. Recorded on
    /// the block for diagnostics only: after a collapse the engine decodes
    /// again from the replayed input and never reuses an output buffer.
    pub can_recode: bool,
}

/// A block format the engine can decode in parallel.
pub trait BlockCodec: Sync {
    type Coder: Send;
    type ReadState: Send + Clone;
    type WriteState: Send;

    /// Per-slot decoder state. Failure makes the engine treat the slot as
    /// unavailable and continue with one thread.
    fn create_coder(&self, slot: usize) -> Result<Self::Coder>;

    fn create_read_state(&self) -> Self::ReadState;

    fn create_write_state(&self) -> Self::WriteState;

    /// Finds the boundary of the current block. May record layout details in
    /// `coder` for the later stages.
    fn parse(
        &self,
        state: &mut Self::ReadState,
        coder: &mut Self::Coder,
        info: &ParseInfo<'_>,
    ) -> Result<ParseOutcome>;

    /// Prepares `coder` to decode `block`. `Memory` errors are retried once
    /// when every earlier block has been written.
    fn pre_code(&self, coder: &mut Self::Coder, block: &BlockDescriptor) -> Result<()>;

    /// Decodes the next slice of the block's raw input.
    fn code(
        &self,
        coder: &mut Self::Coder,
        src: &[u8],
        src_finished: bool,
    ) -> Result<CodeProgress>;

    /// Emits the decoded block. Called in block order, at most once per
    /// block, so the coder may release its output buffer here.
    fn write(
        &self,
        coder: &mut Self::Coder,
        state: &mut Self::WriteState,
        req: WriteRequest<'_>,
    ) -> Result<WriteOutcome>;
}
