// pool.rs — Bounded memory accounting for in-flight blocks.
//
// Every byte a block holds between parse and write is charged here: its input
// chunks (fixed size, recycled through a free list) and the reservation for
// its decoded output. The total never exceeds the ceiling.
//
// Only the read-token holder ever waits in this pool, and everything charged
// by other workers belongs to earlier blocks that will be written and
// released, so a wait always ends. A request that could not fit even with
// the rest of the pool empty fails with `Overflow` instead of waiting.

use std::sync::{Condvar, Mutex, MutexGuard};

use crate::tracelevel;

// Recycled buffers kept around for reuse; the rest are freed.
const FREE_LIST_MAX: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// `held + requested` exceeds the ceiling.
    Overflow { requested: u64, held: u64, ceiling: u64 },
    /// The allocator refused the buffer.
    Alloc { requested: usize },
}

struct PoolState {
    free: Vec<Vec<u8>>,
    charged: u64,
    peak: u64,
    chunks_allocated: usize,
}

pub struct BlockPool {
    chunk_size: usize,
    ceiling: u64,
    state: Mutex<PoolState>,
    released: Condvar,
}

impl BlockPool {
    pub fn new(chunk_size: usize, ceiling: u64) -> Self {
        BlockPool {
            chunk_size,
            ceiling,
            state: Mutex::new(PoolState {
                free: Vec::new(),
                charged: 0,
                peak: 0,
                chunks_allocated: 0,
            }),
            released: Condvar::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    /// Bytes currently charged.
    pub fn in_use(&self) -> u64 {
        self.lock().charged
    }

    /// Highest charge observed.
    pub fn peak(&self) -> u64 {
        self.lock().peak
    }

    /// Distinct chunk buffers allocated over the pool's life.
    pub fn chunks_allocated(&self) -> usize {
        self.lock().chunks_allocated
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Charges `bytes`, waiting for other blocks to release memory if needed.
    /// `held` is what the caller's current block already holds.
    fn charge(&self, bytes: u64, held: u64) -> Result<MutexGuard<'_, PoolState>, PoolError> {
        let mut st = self.lock();
        loop {
            if st.charged + bytes <= self.ceiling {
                break;
            }
            if held + bytes > self.ceiling {
                return Err(PoolError::Overflow { requested: bytes, held, ceiling: self.ceiling });
            }
            tracelevel!("pool: waiting for {} bytes ({} charged)\n", bytes, st.charged);
            st = self.released.wait(st).unwrap_or_else(|e| e.into_inner());
        }
        st.charged += bytes;
        st.peak = st.peak.max(st.charged);
        Ok(st)
    }

    fn release(&self, bytes: u64, buf: Option<Vec<u8>>) {
        let mut st = self.lock();
        st.charged -= bytes;
        if let Some(mut b) = buf {
            if st.free.len() < FREE_LIST_MAX {
                b.clear();
                st.free.push(b);
            }
        }
        drop(st);
        self.released.notify_all();
    }

    /// Takes one empty input chunk of `chunk_size` capacity.
    pub fn acquire_chunk(&self, held: u64) -> Result<InputChunk<'_>, PoolError> {
        let cs = self.chunk_size as u64;
        let mut st = self.charge(cs, held)?;
        let recycled = st.free.pop();
        if recycled.is_none() {
            st.chunks_allocated += 1;
        }
        drop(st);
        let buf = match recycled {
            Some(b) => b,
            None => {
                let mut b = Vec::new();
                if b.try_reserve_exact(self.chunk_size).is_err() {
                    self.release(cs, None);
                    return Err(PoolError::Alloc { requested: self.chunk_size });
                }
                b
            }
        };
        Ok(InputChunk { pool: self, buf, charged: true })
    }

    /// Reserves room for `bytes` of decoded output.
    pub fn reserve_output(&self, bytes: u64, held: u64) -> Result<OutputReservation<'_>, PoolError> {
        let st = self.charge(bytes, held)?;
        drop(st);
        Ok(OutputReservation { pool: self, bytes })
    }
}

/// One fixed-capacity input buffer. Returns itself to the pool on drop.
pub struct InputChunk<'p> {
    pool: &'p BlockPool,
    buf: Vec<u8>,
    charged: bool,
}

impl InputChunk<'_> {
    /// Bytes currently stored.
    pub fn filled(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.pool.chunk_size
    }

    pub fn spare(&self) -> usize {
        self.pool.chunk_size - self.len()
    }

    /// Appends `data`; the caller guarantees it fits.
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= self.spare());
        self.buf.extend_from_slice(data);
    }

    /// Reads from `reader` into the spare capacity until the chunk is full or
    /// the reader is exhausted. Returns the number of bytes added.
    pub fn fill_from<R: std::io::Read + ?Sized>(&mut self, reader: &mut R) -> std::io::Result<usize> {
        let cs = self.pool.chunk_size;
        let buf = &mut self.buf;
        let start = buf.len();
        buf.resize(cs, 0);
        let res = crate::util::read_to_capacity(reader, &mut buf[start..]);
        let n = *res.as_ref().unwrap_or(&0);
        buf.truncate(start + n);
        res
    }

    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    /// Detaches the buffer from the pool, releasing its charge.
    pub fn into_vec(mut self) -> Vec<u8> {
        self.charged = false;
        self.pool.release(self.pool.chunk_size as u64, None);
        std::mem::take(&mut self.buf)
    }
}

impl Drop for InputChunk<'_> {
    fn drop(&mut self) {
        if self.charged {
            let buf = std::mem::take(&mut self.buf);
            self.pool.release(self.pool.chunk_size as u64, Some(buf));
        }
    }
}

/// Charge for one block's decoded output. Released on drop.
pub struct OutputReservation<'p> {
    pool: &'p BlockPool,
    bytes: u64,
}

impl OutputReservation<'_> {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

impl Drop for OutputReservation<'_> {
    fn drop(&mut self) {
        self.pool.release(self.bytes, None);
    }
}
