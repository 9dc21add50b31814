// single.rs — Single-thread decoding.
//
// Used when only one thread is allowed, when the first worker cannot start,
// and to finish a stream after multi-thread decoding collapsed. Input comes
// from three places in order: bytes replayed from the collapsed block, the
// carry, then the source. Blocks are never buffered whole: once the parser
// has announced a block's size, every parsed slice goes straight to the coder.

use std::collections::VecDeque;

use crate::error::MtDecError;
use crate::tracelevel;

use super::aggregate::Aggregate;
use super::block::{BlockDescriptor, BlockStatus};
use super::codec::{BlockCodec, ParseInfo, ParseState};
use super::sides::{ReadSide, WriteSide};
use super::stages::{commit_block, feed};

/// Pending input ahead of the source.
struct InputQueue {
    pieces: VecDeque<Vec<u8>>,
}

impl InputQueue {
    fn new(replay: Vec<Vec<u8>>, carry: Vec<u8>) -> Self {
        let pieces = replay
            .into_iter()
            .chain(std::iter::once(carry))
            .filter(|p| !p.is_empty())
            .collect();
        InputQueue { pieces }
    }

    fn next<S>(&mut self, read: &mut ReadSide<'_, S>, chunk_size: usize) -> Result<Vec<u8>, MtDecError> {
        match self.pieces.pop_front() {
            Some(p) => Ok(p),
            None if read.source_finished => Ok(Vec::new()),
            None => Ok(read.read_buf(chunk_size)?),
        }
    }

    fn push_front(&mut self, piece: &[u8]) {
        if !piece.is_empty() {
            self.pieces.push_front(piece.to_vec());
        }
    }

    fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    fn front(&self) -> &[u8] {
        self.pieces.front().map_or(&[], |p| p.as_slice())
    }
}

/// Decodes blocks on the calling thread until the stream ends or stops.
/// Failures are recorded in `aggregate`.
pub fn decode_single<C: BlockCodec>(
    codec: &C,
    aggregate: &Aggregate,
    coder: &mut C::Coder,
    read: &mut ReadSide<'_, C::ReadState>,
    write: &mut WriteSide<'_, C::WriteState>,
    replay: Vec<Vec<u8>>,
    chunk_size: usize,
) {
    let mut queue = InputQueue::new(replay, read.carry.take());

    loop {
        let index = read.next_block;
        if aggregate.stopped_at(index) {
            break;
        }
        read.next_block += 1;
        let mut block = BlockDescriptor::new(index);

        if let Err(e) = stream_block(codec, aggregate, coder, read, &mut queue, &mut block, chunk_size) {
            block.mark_failed(&e);
            aggregate.fail(index, e);
            break;
        }

        if block.is_end && queue.is_empty() && !read.source_finished {
            match read.read_buf(chunk_size) {
                Ok(buf) => queue.push_front(&buf),
                Err(e) => aggregate.interrupt_before(index + 1, Some(MtDecError::Read(e))),
            }
        }
        let extra: &[u8] = if block.is_end { queue.front() } else { &[] };
        let go_on = commit_block(codec, coder, write, aggregate, &mut block, true, extra);
        if block.is_end && !go_on {
            break;
        }
    }

    // Unread input goes back to the carry so the read side stays consistent.
    let mut rest = Vec::new();
    for p in queue.pieces.drain(..) {
        rest.extend_from_slice(&p);
    }
    read.carry.replace(rest);
}

// Parses one block and decodes it as it goes.
fn stream_block<C: BlockCodec>(
    codec: &C,
    aggregate: &Aggregate,
    coder: &mut C::Coder,
    read: &mut ReadSide<'_, C::ReadState>,
    queue: &mut InputQueue,
    block: &mut BlockDescriptor,
    chunk_size: usize,
) -> Result<(), MtDecError> {
    let mut pending: Vec<u8> = Vec::new();
    let mut coding = false;
    let mut finished = false;
    let mut start_call = true;

    loop {
        let piece = queue.next(read, chunk_size)?;
        let src_finished = queue.is_empty() && read.source_finished;
        let info = ParseInfo { start_call, src: &piece, src_finished, block_limit: None };
        start_call = false;
        let out = codec.parse(&mut read.parser, coder, &info)?;
        if let Some(est) = out.out_size_estimate {
            block.out_estimate = est;
        }

        let boundary = match out.state {
            ParseState::Continue => {
                if out.consumed != piece.len() {
                    return Err(MtDecError::data("parser left input unconsumed"));
                }
                false
            }
            ParseState::NewBlock | ParseState::End => {
                if out.consumed > piece.len() {
                    return Err(MtDecError::data("parser consumed past its input"));
                }
                true
            }
            ParseState::Overflow => {
                return Err(MtDecError::data("parser reported overflow without a block limit"));
            }
        };
        let body = &piece[..out.consumed];
        block.in_size += body.len() as u64;

        if !coding && (out.out_size_estimate.is_some() || boundary) {
            codec.pre_code(coder, block)?;
            coding = true;
            if !pending.is_empty() {
                let buffered = std::mem::take(&mut pending);
                finished = feed(codec, aggregate, coder, block, &buffered, false)?;
            }
        }
        if coding {
            if finished {
                if !body.is_empty() {
                    return Err(MtDecError::data("data after the block end mark"));
                }
            } else if !body.is_empty() || boundary {
                finished = feed(codec, aggregate, coder, block, body, boundary)?;
            }
        } else {
            pending.extend_from_slice(body);
        }

        if boundary {
            queue.push_front(&piece[out.consumed..]);
            block.is_end = out.state == ParseState::End;
            if !block.is_end && block.in_size == 0 {
                return Err(MtDecError::data("empty block"));
            }
            block.status = BlockStatus::Coded;
            tracelevel!("block {}: decoded on one thread ({} -> {})\n", block.index, block.in_size, block.out_size);
            return Ok(());
        }
        if src_finished {
            return Err(MtDecError::InputEof);
        }
    }
}
