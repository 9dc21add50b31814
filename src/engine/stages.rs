// stages.rs — Parse, code and write stages for one block.
//
// `parse_block` runs under canRead and decides what happens next: a complete
// block to decode, a stop, or a hand-over to single-thread decoding with the
// block's bytes kept for replay. `code_block` runs with no token held.
// `commit_block` runs under canWrite and is shared with the single-thread
// loop, so both paths apply the same flush, truncation and progress rules.

use crate::error::MtDecError;
use crate::{displaylevel, tracelevel};

use super::aggregate::Aggregate;
use super::block::{BlockDescriptor, BlockStatus};
use super::codec::{BlockCodec, CodeStatus, ParseInfo, ParseState, WriteRequest};
use super::pool::{BlockPool, InputChunk, OutputReservation, PoolError};
use super::sides::{ReadSide, WriteSide};
use super::state::CollapseReason;

pub enum ParseStep<'p> {
    /// A whole block sits in `chain`; its output is reserved.
    Block {
        chain: Vec<InputChunk<'p>>,
        reservation: OutputReservation<'p>,
    },
    /// Nothing to decode: the stream was interrupted at or before this block,
    /// or the failure has been recorded in the aggregate.
    Stop,
    /// Multi-thread decoding cannot take this block. The parser is rewound to
    /// the block start and `replay` holds every byte already pulled for it.
    Collapse {
        replay: Vec<InputChunk<'p>>,
        reason: CollapseReason,
    },
}

fn collapse_reason(err: PoolError) -> CollapseReason {
    match err {
        PoolError::Overflow { .. } => CollapseReason::Overflow,
        PoolError::Alloc { .. } => CollapseReason::Memory,
    }
}

// Puts the read side back at the start of `block`.
fn rewind<S: Clone>(read: &mut ReadSide<'_, S>, checkpoint: &S, block: &mut BlockDescriptor) {
    read.parser = checkpoint.clone();
    read.next_block = block.index;
    block.in_size = 0;
}

/// Pulls input until the parser reports the end of `block`.
pub fn parse_block<'p, C: BlockCodec>(
    codec: &C,
    pool: &'p BlockPool,
    aggregate: &Aggregate,
    read: &mut ReadSide<'_, C::ReadState>,
    coder: &mut C::Coder,
    block: &mut BlockDescriptor,
) -> ParseStep<'p> {
    let checkpoint = read.parser.clone();
    let mut carry = read.carry.take();
    let mut chain: Vec<InputChunk<'p>> = Vec::new();
    let mut held: u64 = 0;
    let mut start_call = true;

    loop {
        if aggregate.stopped_at(block.index) {
            return ParseStep::Stop;
        }

        if chain.last().map_or(true, |c| c.is_full()) {
            match pool.acquire_chunk(held) {
                Ok(c) => {
                    held += pool.chunk_size() as u64;
                    chain.push(c);
                }
                Err(e) => {
                    displaylevel!(4, "mtdec: block {}: input chunk refused ({:?})\n", block.index, e);
                    read.carry.replace(carry);
                    rewind(read, &checkpoint, block);
                    return ParseStep::Collapse { replay: chain, reason: collapse_reason(e) };
                }
            }
        }

        let last = chain.len() - 1;
        let start = chain[last].len();
        if !carry.is_empty() {
            chain[last].extend_from_slice(&carry);
            carry.clear();
        }
        if !read.source_finished {
            if let Err(e) = read.fill_chunk(&mut chain[last]) {
                aggregate.fail(block.index, MtDecError::Read(e));
                return ParseStep::Stop;
            }
        }

        let chunk = &mut chain[last];
        let src = &chunk.filled()[start..];
        let info = ParseInfo {
            start_call,
            src,
            src_finished: read.source_finished,
            block_limit: Some(pool.ceiling()),
        };
        start_call = false;
        let outcome = match codec.parse(&mut read.parser, coder, &info) {
            Ok(o) => o,
            Err(e) => {
                block.mark_failed(&e);
                aggregate.fail(block.index, e);
                return ParseStep::Stop;
            }
        };
        if let Some(est) = outcome.out_size_estimate {
            block.out_estimate = est;
        }

        match outcome.state {
            ParseState::Continue => {
                if outcome.consumed != src.len() {
                    aggregate.fail(block.index, MtDecError::data("parser left input unconsumed"));
                    return ParseStep::Stop;
                }
                block.in_size += src.len() as u64;
                if read.source_finished {
                    block.mark_failed(&MtDecError::InputEof);
                    aggregate.fail(block.index, MtDecError::InputEof);
                    return ParseStep::Stop;
                }
            }
            ParseState::NewBlock | ParseState::End => {
                if outcome.consumed > src.len() {
                    aggregate.fail(block.index, MtDecError::data("parser consumed past its input"));
                    return ParseStep::Stop;
                }
                block.in_size += outcome.consumed as u64;
                let boundary = start + outcome.consumed;
                read.carry.stash(&chunk.filled()[boundary..]);
                chunk.truncate(boundary);

                if outcome.state == ParseState::End {
                    block.is_end = true;
                    if let Err(e) = read.peek_into_carry(pool.chunk_size()) {
                        aggregate.interrupt_before(block.index + 1, Some(MtDecError::Read(e)));
                    }
                } else if block.in_size == 0 {
                    aggregate.fail(block.index, MtDecError::data("empty block"));
                    return ParseStep::Stop;
                }

                match pool.reserve_output(block.out_estimate, held) {
                    Ok(reservation) => {
                        block.status = BlockStatus::Parsed;
                        tracelevel!(
                            "block {}: parsed {} bytes in {} chunk(s), ~{} out\n",
                            block.index,
                            block.in_size,
                            chain.len(),
                            block.out_estimate
                        );
                        return ParseStep::Block { chain, reservation };
                    }
                    Err(e) => {
                        displaylevel!(4, "mtdec: block {}: output reservation refused ({:?})\n", block.index, e);
                        rewind(read, &checkpoint, block);
                        block.is_end = false;
                        return ParseStep::Collapse { replay: chain, reason: collapse_reason(e) };
                    }
                }
            }
            ParseState::Overflow => {
                displaylevel!(4, "mtdec: block {} exceeds the memory limit\n", block.index);
                rewind(read, &checkpoint, block);
                return ParseStep::Collapse { replay: chain, reason: CollapseReason::Overflow };
            }
        }
    }
}

/// Feeds `src` to the coder, updating the block and the aggregate counters.
/// Returns `true` once the coder reports the block's end mark. `last` means
/// no further input belongs to the block.
pub fn feed<C: BlockCodec>(
    codec: &C,
    aggregate: &Aggregate,
    coder: &mut C::Coder,
    block: &mut BlockDescriptor,
    src: &[u8],
    last: bool,
) -> Result<bool, MtDecError> {
    let mut pos = 0;
    loop {
        let p = codec.code(coder, &src[pos..], last)?;
        pos += p.in_consumed;
        block.out_size += p.out_produced as u64;
        aggregate.add_decoded(p.in_consumed as u64, p.out_produced as u64);
        if p.status == CodeStatus::FinishedWithMark {
            if pos != src.len() {
                return Err(MtDecError::data("block decoder stopped before the end of the block"));
            }
            return Ok(true);
        }
        if pos == src.len() {
            if last {
                return Err(MtDecError::data("block ended before the decoder finished"));
            }
            return Ok(false);
        }
        if p.in_consumed == 0 && p.out_produced == 0 {
            return Err(MtDecError::data("block decoder made no progress"));
        }
    }
}

/// Decodes a fully parsed block.
pub fn code_block<C: BlockCodec>(
    codec: &C,
    aggregate: &Aggregate,
    coder: &mut C::Coder,
    block: &mut BlockDescriptor,
    chain: &[InputChunk<'_>],
) -> Result<(), MtDecError> {
    block.out_size = 0;
    codec.pre_code(coder, block)?;
    // Only the final chunk can be empty (the boundary fell on a chunk edge).
    let end = chain.iter().rposition(|c| !c.is_empty());
    let mut finished = false;
    if let Some(end) = end {
        for (i, chunk) in chain[..=end].iter().enumerate() {
            if finished {
                return Err(MtDecError::data("data after the block end mark"));
            }
            finished = feed(codec, aggregate, coder, block, chunk.filled(), i == end)?;
        }
    }
    if !finished {
        feed(codec, aggregate, coder, block, &[], true)?;
    }
    block.status = BlockStatus::Coded;
    Ok(())
}

/// Write stage. Returns whether decoding should go on past an `End` block.
pub fn commit_block<C: BlockCodec>(
    codec: &C,
    coder: &mut C::Coder,
    write: &mut WriteSide<'_, C::WriteState>,
    aggregate: &Aggregate,
    block: &mut BlockDescriptor,
    coded_ok: bool,
    extra: &[u8],
) -> bool {
    let allowed = coded_ok && aggregate.may_flush(block.index);
    let req = WriteRequest {
        sink: &mut write.sink,
        need_write_to_stream: allowed,
        extra,
        block: &*block,
    };
    let outcome = match codec.write(coder, &mut write.state, req) {
        Ok(o) => o,
        Err(e) => {
            block.mark_failed(&e);
            aggregate.fail(block.index, e);
            return false;
        }
    };
    block.can_recode = outcome.can_recode;
    if !allowed {
        if block.status != BlockStatus::Failed {
            block.status = BlockStatus::Discarded;
        }
        return false;
    }

    block.status = BlockStatus::Written;
    write.bytes_in += block.in_size;
    write.blocks += 1;
    tracelevel!(
        "block {}: written ({} -> {}){}\n",
        block.index,
        block.in_size,
        block.out_size,
        if block.can_recode { ", output kept" } else { "" }
    );

    if write.sink.truncated() {
        block.truncated = true;
        displaylevel!(3, "mtdec: output limit reached at block {}\n", block.index);
        aggregate.interrupt_before(block.index + 1, None);
        return false;
    }
    if let Some(p) = write.progress.as_mut() {
        let (in_done, out_done) = aggregate.decoded();
        if !p.progress(in_done, out_done) {
            aggregate.interrupt_before(block.index + 1, Some(MtDecError::ProgressCancel));
            return false;
        }
    }
    block.is_end && outcome.need_continue
}
