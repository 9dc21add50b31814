// state.rs — Engine-level state machine.
//
//   Parsing ──ThreadsStarted──▶ MultiThreadOk ──Collapse(r)──▶ Collapsing(r)
//      │                            │                              │
//      └──SingleThreadRequested──┐  └──Finished──▶ Done | Error    DrainComplete
//                                ▼                                 ▼
//                           SingleThread ◀─────────────────────────┘
//                                │
//                                └──Finished──▶ Done | Error
//
// Transitions are driven by the coordinator only; workers report through the
// finish message, never by touching this value.

use std::fmt;

use crate::displaylevel;

/// Why multi-thread decoding stopped before the end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollapseReason {
    /// A block was larger than the memory ceiling allows.
    Overflow,
    /// An allocation failed.
    Memory,
    /// A worker thread could not be created.
    Threading,
}

impl fmt::Display for CollapseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollapseReason::Overflow => "block larger than memory limit",
            CollapseReason::Memory => "out of memory",
            CollapseReason::Threading => "thread creation failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Parsing,
    MultiThreadOk,
    Collapsing(CollapseReason),
    SingleThread,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    /// The first worker is running and holds both tokens.
    ThreadsStarted,
    /// Decoding proceeds on the calling thread from the start.
    SingleThreadRequested,
    Collapse(CollapseReason),
    /// Every worker has exited; the remaining input belongs to one thread.
    DrainComplete,
    Finished { failed: bool },
}

impl EngineState {
    /// Applies `event`. An event that makes no sense in the current state is
    /// logged and leaves the state unchanged.
    pub fn on(self, event: StateEvent) -> EngineState {
        use EngineState as S;
        use StateEvent as E;
        let next = match (self, event) {
            (S::Parsing, E::ThreadsStarted) => Some(S::MultiThreadOk),
            (S::Parsing, E::SingleThreadRequested) => Some(S::SingleThread),
            (S::MultiThreadOk, E::Collapse(r)) => Some(S::Collapsing(r)),
            (S::Collapsing(_), E::DrainComplete) => Some(S::SingleThread),
            (S::MultiThreadOk | S::SingleThread, E::Finished { failed }) => {
                Some(if failed { S::Error } else { S::Done })
            }
            (S::Parsing, _)
            | (S::MultiThreadOk, _)
            | (S::Collapsing(_), _)
            | (S::SingleThread, _)
            | (S::Done, _)
            | (S::Error, _) => None,
        };
        match next {
            Some(s) => s,
            None => {
                displaylevel!(1, "mtdec: ignoring {:?} in state {:?}\n", event, self);
                self
            }
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Done | EngineState::Error)
    }
}
