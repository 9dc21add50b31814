//! Error taxonomy for the decode engine and its codecs.
//!
//! | Kind              | Origin                                  | Engine policy                         |
//! |-------------------|-----------------------------------------|---------------------------------------|
//! | `InputEof`        | stream ended inside a block             | final result                          |
//! | `Data`            | malformed data found by a codec         | final result                          |
//! | `Memory`          | allocation failure                      | absorbed: concurrency drops to 1      |
//! | `Threading`       | thread spawn / worker setup failure     | absorbed: concurrency drops to 1      |
//! | `Write`           | sink rejected bytes                     | final result, never retried           |
//! | `Read`            | source stream failure                   | final result                          |
//! | `ProgressCancel`  | progress callback asked to stop         | final result, clean abort             |
//!
//! `Memory` and `Threading` only surface to the caller when they happen while
//! the engine is already running single-threaded.

use std::fmt;
use std::io;

/// Comparable discriminant of [`MtDecError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputEof,
    Data,
    Memory,
    Threading,
    Write,
    Read,
    ProgressCancel,
}

/// Error returned by the engine and by [`BlockCodec`](crate::engine::BlockCodec)
/// implementations.
#[derive(Debug)]
pub enum MtDecError {
    /// The input ended before the current block could be closed.
    InputEof,
    /// Codec-level malformed data.
    Data(String),
    /// An allocation of `requested` bytes failed.
    Memory { requested: usize },
    /// A worker thread or its per-slot state could not be created.
    Threading(String),
    /// The output sink rejected bytes.
    Write(io::Error),
    /// The input source failed.
    Read(io::Error),
    /// The progress callback requested a stop.
    ProgressCancel,
}

impl MtDecError {
    /// Shorthand for [`MtDecError::Data`].
    pub fn data(msg: impl Into<String>) -> Self {
        MtDecError::Data(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MtDecError::InputEof => ErrorKind::InputEof,
            MtDecError::Data(_) => ErrorKind::Data,
            MtDecError::Memory { .. } => ErrorKind::Memory,
            MtDecError::Threading(_) => ErrorKind::Threading,
            MtDecError::Write(_) => ErrorKind::Write,
            MtDecError::Read(_) => ErrorKind::Read,
            MtDecError::ProgressCancel => ErrorKind::ProgressCancel,
        }
    }
}

impl fmt::Display for MtDecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MtDecError::InputEof => write!(f, "unexpected end of input"),
            MtDecError::Data(msg) => write!(f, "data error: {}", msg),
            MtDecError::Memory { requested } => {
                write!(f, "memory allocation of {} bytes failed", requested)
            }
            MtDecError::Threading(msg) => write!(f, "threading error: {}", msg),
            MtDecError::Write(e) => write!(f, "write error: {}", e),
            MtDecError::Read(e) => write!(f, "read error: {}", e),
            MtDecError::ProgressCancel => write!(f, "operation cancelled by progress callback"),
        }
    }
}

impl std::error::Error for MtDecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MtDecError::Write(e) | MtDecError::Read(e) => Some(e),
            _ => None,
        }
    }
}

/// Source-side I/O failures convert implicitly; sink failures must be wrapped
/// with [`MtDecError::Write`] at the call site.
impl From<io::Error> for MtDecError {
    fn from(e: io::Error) -> Self {
        MtDecError::Read(e)
    }
}

pub type Result<T> = std::result::Result<T, MtDecError>;
