// scheduler.rs — Worker slots for multi-thread decoding.
//
// Worker loop (slot i):
//
//   wait canRead ─▶ claim next index ─▶ parse block ─▶ pass canRead to i+1
//        ▲                                                   │
//        │                                               code block
//        │                                                   │
//   pass canWrite to i+1 ◀── write block ◀── wait canWrite ◀─┘
//
// The worker that keeps canRead instead of passing it (end of stream, stop,
// or a block multi-thread decoding cannot take) writes its block, then hands
// both token payloads back to the coordinator. Threads are spawned lazily:
// a slot's thread starts the first time canRead is passed to it, so a short
// stream never pays for the full ring.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, Scope};

use crossbeam_channel::{unbounded, Sender};

use crate::error::{ErrorKind, MtDecError};
use crate::{displaylevel, tracelevel};

use super::aggregate::Aggregate;
use super::block::BlockDescriptor;
use super::codec::BlockCodec;
use super::pool::{BlockPool, InputChunk};
use super::ring::{Token, TokenRing};
use super::sides::{ReadSide, WriteSide};
use super::stages::{code_block, commit_block, parse_block, ParseStep};
use super::state::CollapseReason;

/// Where single-thread decoding must pick up after a collapse.
pub struct Resume<'p> {
    /// Bytes of the collapsed block already pulled from the source, in order.
    pub replay: Vec<InputChunk<'p>>,
    pub reason: CollapseReason,
}

/// Token payloads returned by the last worker.
pub struct Finish<'p, 'a, C: BlockCodec> {
    pub read: ReadSide<'a, C::ReadState>,
    pub write: WriteSide<'a, C::WriteState>,
    pub resume: Option<Resume<'p>>,
}

enum WorkerExit<'p, 'a, C: BlockCodec> {
    Finished(Finish<'p, 'a, C>),
    Panicked(usize),
}

pub enum MultiRun<'p, 'a, C: BlockCodec> {
    /// The first worker could not be set up; the payloads come back untouched.
    NotStarted {
        read: ReadSide<'a, C::ReadState>,
        write: WriteSide<'a, C::WriteState>,
        reason: MtDecError,
    },
    Finished {
        finish: Finish<'p, 'a, C>,
        threads_started: usize,
    },
    /// A worker panicked. Joining the scope re-raises the panic.
    Aborted,
}

type Ring<'a, C> =
    TokenRing<ReadSide<'a, <C as BlockCodec>::ReadState>, WriteSide<'a, <C as BlockCodec>::WriteState>>;

struct Scheduler<'p, 'a, C: BlockCodec> {
    codec: &'p C,
    pool: &'p BlockPool,
    aggregate: &'p Aggregate,
    ring: Ring<'a, C>,
    started: Vec<AtomicBool>,
    threads_started: AtomicUsize,
    // Set when a block could not get memory for its output buffer.
    memory_pressure: AtomicBool,
    exit_tx: Sender<WorkerExit<'p, 'a, C>>,
}

// Reports a worker panic to the coordinator so it does not wait forever.
struct PanicNotice<'x, 'p, 'a, C: BlockCodec> {
    tx: &'x Sender<WorkerExit<'p, 'a, C>>,
    slot: usize,
}

impl<C: BlockCodec> Drop for PanicNotice<'_, '_, '_, C> {
    fn drop(&mut self) {
        if thread::panicking() {
            let _ = self.tx.send(WorkerExit::Panicked(self.slot));
        }
    }
}

/// Runs the stream on up to `threads` workers until it ends, fails, or has to
/// continue on one thread.
pub fn run_multi<'p, 'a, C: BlockCodec>(
    codec: &'p C,
    pool: &'p BlockPool,
    aggregate: &'p Aggregate,
    threads: usize,
    read: ReadSide<'a, C::ReadState>,
    write: WriteSide<'a, C::WriteState>,
) -> MultiRun<'p, 'a, C> {
    let (exit_tx, exit_rx) = unbounded();
    let sched = Scheduler {
        codec,
        pool,
        aggregate,
        ring: TokenRing::new(threads),
        started: (0..threads).map(|_| AtomicBool::new(false)).collect(),
        threads_started: AtomicUsize::new(0),
        memory_pressure: AtomicBool::new(false),
        exit_tx,
    };

    thread::scope(|scope| {
        let coder = match codec.create_coder(0) {
            Ok(c) => c,
            Err(reason) => return MultiRun::NotStarted { read, write, reason },
        };
        if let Err(reason) = sched.spawn_slot(scope, 0, coder) {
            return MultiRun::NotStarted { read, write, reason };
        }
        sched.ring.grant_read(0, read);
        sched.ring.grant_write(0, write);

        let exit = exit_rx.recv();
        let run = match exit {
            Ok(WorkerExit::Finished(finish)) => MultiRun::Finished {
                finish,
                threads_started: sched.threads_started.load(Ordering::Acquire),
            },
            Ok(WorkerExit::Panicked(slot)) => {
                displaylevel!(1, "mtdec: worker {} panicked\n", slot);
                aggregate.fail(0, MtDecError::Threading(format!("worker {} panicked", slot)));
                MultiRun::Aborted
            }
            Err(_) => MultiRun::Aborted,
        };
        sched.shut_down();
        run
    })
}

impl<'p, 'a, C: BlockCodec> Scheduler<'p, 'a, C> {
    fn spawn_slot<'s, 'env>(
        &'s self,
        scope: &'s Scope<'s, 'env>,
        slot: usize,
        coder: C::Coder,
    ) -> Result<(), MtDecError> {
        thread::Builder::new()
            .name(format!("mtdec-{}", slot))
            .spawn_scoped(scope, move || self.worker(scope, slot, coder))
            .map_err(|e| MtDecError::Threading(format!("cannot spawn worker {}: {}", slot, e)))?;
        self.started[slot].store(true, Ordering::Release);
        self.threads_started.fetch_add(1, Ordering::AcqRel);
        displaylevel!(4, "mtdec: worker {} started\n", slot);
        Ok(())
    }

    /// Hands canRead to the next slot, starting its thread first if needed.
    /// On failure the payload comes back with the reason.
    #[allow(clippy::result_large_err)]
    fn pass_read<'s, 'env>(
        &'s self,
        scope: &'s Scope<'s, 'env>,
        slot: usize,
        read: ReadSide<'a, C::ReadState>,
    ) -> Result<(), (ReadSide<'a, C::ReadState>, MtDecError)> {
        let next = self.ring.next(slot);
        if !self.started[next].load(Ordering::Acquire) {
            let coder = match self.codec.create_coder(next) {
                Ok(c) => c,
                Err(e) => return Err((read, e)),
            };
            if let Err(e) = self.spawn_slot(scope, next, coder) {
                return Err((read, e));
            }
        }
        tracelevel!("slot {}: canRead -> slot {}\n", slot, next);
        self.ring.grant_read(next, read);
        Ok(())
    }

    fn shut_down(&self) {
        for (slot, started) in self.started.iter().enumerate() {
            if started.load(Ordering::Acquire) {
                self.ring.post_exit(slot);
            }
        }
    }

    fn worker<'s, 'env>(&'s self, scope: &'s Scope<'s, 'env>, slot: usize, mut coder: C::Coder) {
        let _notice = PanicNotice { tx: &self.exit_tx, slot };

        loop {
            let mut read = match self.ring.wait_read(slot) {
                Token::Grant(r) => r,
                Token::Exit => return,
            };
            let mut block = BlockDescriptor::new(read.next_block);
            read.next_block += 1;

            let step = if self.aggregate.stopped_at(block.index) {
                ParseStep::Stop
            } else if self.memory_pressure.load(Ordering::Acquire) {
                read.next_block = block.index;
                ParseStep::Collapse { replay: Vec::new(), reason: CollapseReason::Memory }
            } else {
                parse_block(self.codec, self.pool, self.aggregate, &mut read, &mut coder, &mut block)
            };

            // The read side stays here unless it moves on to the next slot.
            let mut kept_read = None;
            let mut resume = None;
            let mut work = None;
            match step {
                ParseStep::Block { chain, reservation } => {
                    if block.is_end {
                        kept_read = Some(read);
                    } else if let Err((r, e)) = self.pass_read(scope, slot, read) {
                        displaylevel!(3, "mtdec: {}; continuing with one thread\n", e);
                        kept_read = Some(r);
                        resume = Some(Resume { replay: Vec::new(), reason: CollapseReason::Threading });
                    }
                    work = Some((chain, reservation));
                }
                ParseStep::Stop => kept_read = Some(read),
                ParseStep::Collapse { replay, reason } => {
                    displaylevel!(3, "mtdec: block {}: {}; continuing with one thread\n", block.index, reason);
                    kept_read = Some(read);
                    resume = Some(Resume { replay, reason });
                }
            }

            let mut coded = false;
            let mut retry = false;
            if let Some((chain, _)) = &work {
                match code_block(self.codec, self.aggregate, &mut coder, &mut block, chain) {
                    Ok(()) => coded = true,
                    Err(e) if e.kind() == ErrorKind::Memory => {
                        displaylevel!(4, "mtdec: block {}: {}; retrying at write turn\n", block.index, e);
                        self.memory_pressure.store(true, Ordering::Release);
                        retry = true;
                    }
                    Err(e) => {
                        block.mark_failed(&e);
                        self.aggregate.fail(block.index, e);
                    }
                }
            }

            let mut write = match self.ring.wait_write(slot) {
                Token::Grant(w) => w,
                Token::Exit => return,
            };

            let mut need_continue = false;
            if let Some((chain, reservation)) = work.take() {
                // Every earlier block is written now, so their memory is back.
                if retry && self.aggregate.may_flush(block.index) {
                    match code_block(self.codec, self.aggregate, &mut coder, &mut block, &chain) {
                        Ok(()) => coded = true,
                        Err(e) => {
                            block.mark_failed(&e);
                            self.aggregate.fail(block.index, e);
                        }
                    }
                }
                let extra: &[u8] = match (&kept_read, block.is_end) {
                    (Some(r), true) => r.carry.as_slice(),
                    _ => &[],
                };
                need_continue =
                    commit_block(self.codec, &mut coder, &mut write, self.aggregate, &mut block, coded, extra);
                drop(chain);
                drop(reservation);
            }

            match kept_read {
                None => {
                    tracelevel!("slot {}: canWrite -> slot {}\n", slot, self.ring.next(slot));
                    self.ring.grant_write(self.ring.next(slot), write);
                }
                Some(read) if need_continue && resume.is_none() => {
                    // Another stream follows: restart the ring at slot 0.
                    displaylevel!(4, "mtdec: stream ended at block {}; next stream follows\n", block.index);
                    self.ring.grant_read(0, read);
                    self.ring.grant_write(0, write);
                }
                Some(read) => {
                    let _ = self.exit_tx.send(WorkerExit::Finished(Finish { read, write, resume }));
                    return;
                }
            }
        }
    }
}
