//! Multithreaded streaming decode engine.
//!
//! A stream is a sequence of independently decodable blocks whose boundaries
//! only the codec can find. [`decode_mt`] splits the work of one stream across
//! a ring of worker slots:
//!
//! - boundary detection is sequential: one worker at a time holds the read
//!   token and parses the next block;
//! - decoding is parallel: once its block is parsed, a worker passes the read
//!   token on and decodes while the next worker parses;
//! - output is sequential: a write token travels the same ring, so blocks
//!   reach the sink in stream order.
//!
//! Input is held in fixed-size chunks charged against a memory ceiling
//! ([`MtDecProps::mem_use_max`]). When a block cannot be taken by the ring
//! (too large, out of memory, no thread available) every earlier block is
//! written first, then the rest of the stream is decoded on the calling
//! thread, starting from the very bytes already read. Output is identical
//! for every thread count.
//!
//! Errors are reported by block order: if blocks 3 and 5 both fail, the
//! caller sees block 3's error and blocks 0..3 are in the output, whichever
//! worker noticed its failure first.

mod aggregate;
mod block;
mod carry;
mod codec;
mod pool;
mod props;
mod ring;
mod scheduler;
mod sides;
mod single;
mod stages;
mod state;

use std::io::{Read, Write};

use crate::displaylevel;
use crate::error::{MtDecError, Result};

pub use aggregate::Aggregate;
pub use block::{BlockDescriptor, BlockStatus};
pub use carry::CrossBlockCarry;
pub use codec::{
    BlockCodec, CodeProgress, CodeStatus, ParseInfo, ParseOutcome, ParseState, WriteOutcome,
    WriteRequest,
};
pub use pool::{BlockPool, InputChunk, OutputReservation, PoolError};
pub use props::{DecodeStats, MtDecProps, Progress};
pub use ring::{Token, TokenRing};
pub use state::{CollapseReason, EngineState, StateEvent};

use scheduler::MultiRun;
use sides::{ReadSide, WriteSide};

/// Decodes `input` into `output` with up to `props.num_threads_max` threads.
///
/// Returns the first error by block order, with every block before it
/// written. `stats` is filled in on success and on failure.
pub fn decode_mt<'a, C: BlockCodec>(
    codec: &C,
    input: &'a mut (dyn Read + Send),
    output: &'a mut (dyn Write + Send),
    props: &MtDecProps,
    progress: Option<&'a mut (dyn Progress + Send)>,
    stats: &mut DecodeStats,
) -> Result<()> {
    *stats = DecodeStats::default();
    let threads = props.effective_threads();
    let chunk_size = props.effective_in_buf_size();
    let aggregate = Aggregate::new();
    let mut state = EngineState::Parsing;

    let mut read = ReadSide::new(input, codec.create_read_state());
    let mut write = WriteSide::new(output, props.out_size_limit, codec.create_write_state(), progress);
    let mut replay: Vec<Vec<u8>> = Vec::new();
    let mut run_single = true;

    if threads > 1 {
        let pool = BlockPool::new(chunk_size, props.mem_use_max);
        match scheduler::run_multi(codec, &pool, &aggregate, threads, read, write) {
            MultiRun::NotStarted { read: r, write: w, reason } => {
                displaylevel!(3, "mtdec: {}; decoding with one thread\n", reason);
                read = r;
                write = w;
                stats.fallback = Some(CollapseReason::Threading);
                state = state.on(StateEvent::SingleThreadRequested);
            }
            MultiRun::Finished { finish, threads_started } => {
                state = state.on(StateEvent::ThreadsStarted);
                stats.threads_started = threads_started;
                read = finish.read;
                write = finish.write;
                match finish.resume {
                    None => run_single = false,
                    Some(resume) => {
                        state = state.on(StateEvent::Collapse(resume.reason));
                        stats.fallback = Some(resume.reason);
                        replay = resume.replay.into_iter().map(InputChunk::into_vec).collect();
                        state = state.on(StateEvent::DrainComplete);
                    }
                }
            }
            MultiRun::Aborted => {
                stats.final_state = EngineState::Error;
                return Err(aggregate
                    .take_error()
                    .unwrap_or_else(|| MtDecError::Threading("worker aborted".into())));
            }
        }
        stats.peak_memory = pool.peak();
        displaylevel!(
            4,
            "mtdec: {} input chunk(s) allocated, peak {} of {} bytes\n",
            pool.chunks_allocated(),
            stats.peak_memory,
            pool.ceiling()
        );
    } else {
        state = state.on(StateEvent::SingleThreadRequested);
    }

    if run_single {
        match codec.create_coder(0) {
            Ok(mut coder) => {
                single::decode_single(codec, &aggregate, &mut coder, &mut read, &mut write, replay, chunk_size);
            }
            Err(e) => aggregate.fail(read.next_block, e),
        }
    }

    let flushed = write.sink.flush();
    let mut result = match aggregate.take_error() {
        Some(e) => Err(e),
        None => Ok(()),
    };
    if result.is_ok() {
        if let Err(e) = flushed {
            result = Err(MtDecError::Write(e));
        }
    }
    state = state.on(StateEvent::Finished { failed: result.is_err() });
    debug_assert!(state.is_terminal(), "engine ended in {:?}", state);

    stats.multi_thread_used = stats.threads_started > 1;
    stats.bytes_in = write.bytes_in;
    stats.bytes_out = write.sink.written();
    stats.blocks = write.blocks;
    stats.truncated = write.sink.truncated();
    stats.final_state = state;
    displaylevel!(
        4,
        "mtdec: {} block(s), {} -> {} bytes, {} thread(s){}\n",
        stats.blocks,
        stats.bytes_in,
        stats.bytes_out,
        stats.threads_started.max(1),
        match stats.fallback {
            Some(r) => format!(", fallback: {}", r),
            None => String::new(),
        }
    );
    result
}
