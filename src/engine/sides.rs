// sides.rs — Token payloads.
//
// `ReadSide` is everything that must be touched in stream order on the input
// side: the source, the parser state, the carry and the next block index.
// `WriteSide` is its output counterpart. Each lives inside exactly one token
// at a time, which is what makes single ownership of these resources hold.

use std::io::{self, Read, Write};

use super::carry::CrossBlockCarry;
use super::props::Progress;
use crate::util::read_to_capacity;

pub struct ReadSide<'a, S> {
    source: &'a mut (dyn Read + Send),
    pub parser: S,
    pub carry: CrossBlockCarry,
    pub next_block: u64,
    /// The source returned end of stream.
    pub source_finished: bool,
    /// Bytes pulled from the source so far.
    pub bytes_read: u64,
}

impl<'a, S> ReadSide<'a, S> {
    pub fn new(source: &'a mut (dyn Read + Send), parser: S) -> Self {
        ReadSide {
            source,
            parser,
            carry: CrossBlockCarry::new(),
            next_block: 0,
            source_finished: false,
            bytes_read: 0,
        }
    }

    /// Fills `chunk` from the source (see [`InputChunk::fill_from`]).
    ///
    /// [`InputChunk::fill_from`]: super::pool::InputChunk::fill_from
    pub fn fill_chunk(&mut self, chunk: &mut super::pool::InputChunk<'_>) -> io::Result<usize> {
        let want = chunk.spare();
        let n = chunk.fill_from(&mut *self.source)?;
        self.account(n, want);
        Ok(n)
    }

    /// Reads up to `max` bytes into a fresh buffer.
    pub fn read_buf(&mut self, max: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        let n = read_to_capacity(&mut *self.source, &mut buf)?;
        buf.truncate(n);
        self.account(n, max);
        Ok(buf)
    }

    /// Makes sure the carry shows whether any input follows, reading one
    /// buffer from the source if the carry is empty.
    pub fn peek_into_carry(&mut self, max: usize) -> io::Result<()> {
        if self.carry.is_empty() && !self.source_finished {
            let buf = self.read_buf(max)?;
            self.carry.replace(buf);
        }
        Ok(())
    }

    fn account(&mut self, got: usize, wanted: usize) {
        self.bytes_read += got as u64;
        if got < wanted {
            self.source_finished = true;
        }
    }
}

/// Ordered output. Counts accepted bytes and silently drops everything past
/// the size limit.
pub struct OutputSink<'a> {
    inner: &'a mut (dyn Write + Send),
    limit: Option<u64>,
    written: u64,
    truncated: bool,
}

impl<'a> OutputSink<'a> {
    pub fn new(inner: &'a mut (dyn Write + Send), limit: Option<u64>) -> Self {
        OutputSink { inner, limit, written: 0, truncated: false }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Some bytes were dropped because of the limit.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

impl Write for OutputSink<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let take = match self.limit {
            Some(limit) => {
                let room = limit.saturating_sub(self.written);
                (buf.len() as u64).min(room) as usize
            }
            None => buf.len(),
        };
        if take < buf.len() {
            self.truncated = true;
        }
        if take > 0 {
            self.inner.write_all(&buf[..take])?;
            self.written += take as u64;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub struct WriteSide<'a, S> {
    pub sink: OutputSink<'a>,
    pub state: S,
    pub progress: Option<&'a mut (dyn Progress + Send)>,
    /// Raw input bytes of written blocks.
    pub bytes_in: u64,
    /// Blocks written.
    pub blocks: u64,
}

impl<'a, S> WriteSide<'a, S> {
    pub fn new(
        sink: &'a mut (dyn Write + Send),
        limit: Option<u64>,
        state: S,
        progress: Option<&'a mut (dyn Progress + Send)>,
    ) -> Self {
        WriteSide { sink: OutputSink::new(sink, limit), state, progress, bytes_in: 0, blocks: 0 }
    }
}
