//! Multi-threaded MTD frame encoder.
//!
//! The input is read sequentially in `block_size` chunks. Each batch of up to
//! `nb_workers` chunks is encoded concurrently on a dedicated [`rayon`] pool,
//! and the encoded blocks are written in their original order through a
//! [`WriteRegister`]. Peak memory stays proportional to
//! `nb_workers × block_size`.
//!
//! The content checksum is computed over the raw input as it is read and
//! appended after the end mark.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::config::{BLOCK_SIZE_DEFAULT, BLOCK_SIZE_MAX, BLOCK_SIZE_MIN};
use crate::displaylevel;
use crate::util::{default_nb_threads, read_to_capacity};
use crate::xxhash::{content_hasher, xxh32_oneshot, Xxh32State, MTD_SEED};

use super::format::{BlockHeader, FrameHeader, Method, BLOCK_HEADER_SIZE, END_MARK};
use super::rle;

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProps {
    /// Uncompressed bytes per block (clamped to the format's limits).
    pub block_size: usize,
    /// Worker threads used to encode a batch.
    pub nb_workers: usize,
    pub method: Method,
    /// Append the frame-wide content checksum.
    pub content_checksum: bool,
}

impl Default for EncodeProps {
    fn default() -> Self {
        EncodeProps {
            block_size: BLOCK_SIZE_DEFAULT,
            nb_workers: default_nb_threads(),
            method: Method::Rle,
            content_checksum: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeStats {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub blocks: u64,
}

/// Encodes one data block (header + payload). RLE output that would be
/// larger than the input is replaced by a stored block.
pub fn encode_block(data: &[u8], method: Method) -> Vec<u8> {
    debug_assert!(!data.is_empty() && data.len() <= BLOCK_SIZE_MAX);
    let checksum = xxh32_oneshot(data, MTD_SEED);
    let rle_payload = match method {
        Method::Rle => Some(rle::encode(data)).filter(|p| p.len() < data.len()),
        Method::Stored => None,
    };
    let (method, payload): (Method, &[u8]) = match &rle_payload {
        Some(p) => (Method::Rle, p),
        None => (Method::Stored, data),
    };
    let header = BlockHeader {
        method,
        packed_size: payload.len() as u32,
        unpacked_size: data.len() as u32,
        checksum,
    };
    let mut out = Vec::with_capacity(BLOCK_HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.encode());
    out.extend_from_slice(payload);
    out
}

/// Builds a frame block by block, for callers that pick their own block
/// boundaries.
pub struct FrameBuilder {
    out: Vec<u8>,
    hasher: Option<Xxh32State>,
}

impl FrameBuilder {
    pub fn new(content_checksum: bool) -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(&FrameHeader::new(content_checksum).encode());
        FrameBuilder { out, hasher: content_checksum.then(content_hasher) }
    }

    /// Appends one block holding `data`. Empty input adds nothing.
    pub fn push_block(&mut self, data: &[u8], method: Method) -> &mut Self {
        for piece in data.chunks(BLOCK_SIZE_MAX) {
            self.out.extend_from_slice(&encode_block(piece, method));
        }
        if let Some(h) = self.hasher.as_mut() {
            h.update(data);
        }
        self
    }

    /// Appends the end mark and returns the encoded frame.
    pub fn finish(mut self) -> Vec<u8> {
        self.out.push(END_MARK);
        if let Some(h) = self.hasher {
            self.out.extend_from_slice(&h.digest().to_le_bytes());
        }
        self.out
    }
}

// ---------------------------------------------------------------------------
// WriteRegister — ordered write buffer for parallel-encoded blocks
// ---------------------------------------------------------------------------

/// Stores out-of-order encoded blocks and drains them to the writer in
/// sequence.
struct WriteRegister {
    /// Next block ID expected to be written.
    expected_rank: u64,
    pending: Mutex<BTreeMap<u64, Vec<u8>>>,
    /// Encoded bytes written so far.
    total_csize: u64,
    block_size: usize,
}

impl WriteRegister {
    fn new(block_size: usize) -> Self {
        WriteRegister {
            expected_rank: 0,
            pending: Mutex::new(BTreeMap::new()),
            total_csize: 0,
            block_size,
        }
    }

    /// Thread-safe; called from rayon workers.
    fn insert(&self, block_id: u64, data: Vec<u8>) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(block_id, data);
    }

    /// Writes every pending block whose ID continues the sequence from
    /// `expected_rank`; stops at the first gap.
    fn drain_in_order(&mut self, write_fn: &mut dyn FnMut(&[u8]) -> io::Result<()>) -> io::Result<()> {
        loop {
            let data = {
                let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
                match pending.first_entry() {
                    Some(entry) if *entry.key() == self.expected_rank => entry.remove(),
                    _ => break,
                }
            };
            self.total_csize += data.len() as u64;
            write_fn(&data)?;
            self.expected_rank += 1;
            let processed = self.expected_rank * self.block_size as u64;
            displaylevel!(
                3,
                "\rRead : {} MiB   ==> {:.2}%   ",
                processed >> 20,
                self.total_csize as f64 / processed as f64 * 100.0
            );
        }
        Ok(())
    }
}

/// Encodes `input` into one MTD frame on `output`.
pub fn encode_mt<R, W>(input: &mut R, output: &mut W, props: &EncodeProps) -> io::Result<EncodeStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let block_size = props.block_size.clamp(BLOCK_SIZE_MIN, BLOCK_SIZE_MAX);
    let nb_workers = props.nb_workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nb_workers)
        .thread_name(|i| format!("mtdec-enc-{}", i))
        .build()
        .map_err(io::Error::other)?;

    let mut stats = EncodeStats::default();
    let header = FrameHeader::new(props.content_checksum).encode();
    output.write_all(&header)?;
    stats.bytes_out += header.len() as u64;

    let mut hasher = props.content_checksum.then(content_hasher);
    let mut register = WriteRegister::new(block_size);
    let mut next_id: u64 = 0;
    let mut eof = false;

    while !eof {
        let mut batch: Vec<Vec<u8>> = Vec::with_capacity(nb_workers);
        while batch.len() < nb_workers {
            let mut buf = vec![0u8; block_size];
            let n = read_to_capacity(input, &mut buf)?;
            if n < block_size {
                eof = true;
            }
            if n == 0 {
                break;
            }
            buf.truncate(n);
            if let Some(h) = hasher.as_mut() {
                h.update(&buf);
            }
            stats.bytes_in += n as u64;
            batch.push(buf);
            if eof {
                break;
            }
        }
        if batch.is_empty() {
            break;
        }

        let base = next_id;
        next_id += batch.len() as u64;
        let method = props.method;
        let reg = &register;
        pool.install(|| {
            batch
                .par_iter()
                .enumerate()
                .for_each(|(i, chunk)| reg.insert(base + i as u64, encode_block(chunk, method)));
        });
        register.drain_in_order(&mut |d| {
            stats.bytes_out += d.len() as u64;
            output.write_all(d)
        })?;
    }

    output.write_all(&[END_MARK])?;
    stats.bytes_out += 1;
    if let Some(h) = hasher {
        output.write_all(&h.digest().to_le_bytes())?;
        stats.bytes_out += 4;
    }
    output.flush()?;
    stats.blocks = next_id;
    displaylevel!(3, "\r{:79}\r", "");
    Ok(stats)
}

/// Encodes `data` into an in-memory frame.
pub fn encode_to_vec(data: &[u8], props: &EncodeProps) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut src = data;
    encode_mt(&mut src, &mut out, props)?;
    Ok(out)
}
