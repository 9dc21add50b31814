// aggregate.rs — Stream-wide decode status shared by all workers.
//
// Holds the decoded-byte counters fed by the code stage and the earliest
// interrupt point. An interrupt is keyed by (block index, phase):
//
//   Boundary — raised while writing block k-1, takes effect before block k
//              (output limit reached, progress cancelled, trailing read error)
//   InBlock  — raised by block k itself (parse, decode or write failure)
//
// The smallest key wins regardless of which thread reports first, so the
// error a caller sees is the one a sequential decoder would have hit.

use std::sync::{Mutex, MutexGuard};

use crate::error::MtDecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Boundary,
    InBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct InterruptKey {
    index: u64,
    phase: Phase,
}

#[derive(Default)]
struct AggregateState {
    in_decoded: u64,
    out_decoded: u64,
    interrupt: Option<InterruptKey>,
    error: Option<MtDecError>,
}

#[derive(Default)]
pub struct Aggregate {
    state: Mutex<AggregateState>,
}

impl Aggregate {
    pub fn new() -> Self {
        Aggregate::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, key: InterruptKey, err: Option<MtDecError>) {
        let mut st = self.lock();
        if st.interrupt.map_or(true, |cur| key < cur) {
            st.interrupt = Some(key);
            st.error = err;
        }
    }

    /// Stops the stream before block `index`. `err` is the result reported to
    /// the caller, or `None` for a clean stop.
    pub fn interrupt_before(&self, index: u64, err: Option<MtDecError>) {
        self.record(InterruptKey { index, phase: Phase::Boundary }, err);
    }

    /// Records a failure of block `index`; nothing from it or later blocks
    /// reaches the sink.
    pub fn fail(&self, index: u64, err: MtDecError) {
        self.record(InterruptKey { index, phase: Phase::InBlock }, Some(err));
    }

    /// Block `index` may be written: no interrupt at or before it.
    pub fn may_flush(&self, index: u64) -> bool {
        self.lock().interrupt.map_or(true, |k| k.index > index)
    }

    /// Work on block `index` is pointless.
    pub fn stopped_at(&self, index: u64) -> bool {
        !self.may_flush(index)
    }

    /// Adds code-stage progress; returns the new totals.
    pub fn add_decoded(&self, in_bytes: u64, out_bytes: u64) -> (u64, u64) {
        let mut st = self.lock();
        st.in_decoded += in_bytes;
        st.out_decoded += out_bytes;
        (st.in_decoded, st.out_decoded)
    }

    /// Decoded (input, output) totals so far.
    pub fn decoded(&self) -> (u64, u64) {
        let st = self.lock();
        (st.in_decoded, st.out_decoded)
    }

    /// Moves the recorded error out, if any.
    pub fn take_error(&self) -> Option<MtDecError> {
        self.lock().error.take()
    }
}
