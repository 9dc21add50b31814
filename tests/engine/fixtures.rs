// Shared helpers for the engine integration tests: deterministic inputs,
// frame builders, and a codec wrapper that injects faults at chosen blocks.
#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mtdec::engine::BlockDescriptor;
use mtdec::mtd::format::{BlockHeader, BLOCK_HEADER_SIZE, END_MARK, FRAME_HEADER_SIZE};
use mtdec::mtd::{FrameBuilder, FrameParser, FrameWriter, MtdCoder};
use mtdec::{
    decode_mt, encode_to_vec, BlockCodec, CodeProgress, DecodeStats, EncodeProps, Method,
    MtDecError, MtDecProps, MtdCodec, ParseInfo, ParseOutcome, WriteOutcome, WriteRequest,
};

/// Runs of random length mixed with noise, so both RLE and stored blocks
/// show up.
pub fn sample(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed | 1;
    let mut next = move || {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        x
    };
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let r = next();
        let n = (r % 300) as usize + 1;
        if r & 0x8000 != 0 {
            let b = (r >> 24) as u8;
            out.extend(std::iter::repeat(b).take(n));
        } else {
            for _ in 0..n {
                out.push((next() >> 11) as u8);
            }
        }
    }
    out.truncate(len);
    out
}

/// One MTD frame of `data` cut into `block_size` blocks.
pub fn frame(data: &[u8], block_size: usize) -> Vec<u8> {
    let props = EncodeProps { block_size, nb_workers: 2, method: Method::Rle, content_checksum: true };
    encode_to_vec(data, &props).unwrap()
}

/// A frame of stored blocks with the given sizes, taken in order from `data`.
pub fn stored_frame(data: &[u8], sizes: &[usize]) -> Vec<u8> {
    let mut fb = FrameBuilder::new(true);
    let mut pos = 0;
    for &n in sizes {
        fb.push_block(&data[pos..pos + n], Method::Stored);
        pos += n;
    }
    assert_eq!(pos, data.len(), "sizes must cover data");
    fb.finish()
}

/// Byte offset of every data block header in a single frame.
pub fn block_offsets(frame: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut pos = FRAME_HEADER_SIZE;
    while frame[pos] != END_MARK {
        offsets.push(pos);
        let h = BlockHeader::decode(&frame[pos..pos + BLOCK_HEADER_SIZE]).unwrap();
        pos += BLOCK_HEADER_SIZE + h.packed_size as usize;
    }
    offsets
}

pub fn props(threads: usize, in_buf: usize) -> MtDecProps {
    let mut p = MtDecProps::default();
    p.set_num_threads(threads);
    p.set_in_buf_size(in_buf);
    p
}

pub struct Run {
    pub result: mtdec::Result<()>,
    pub out: Vec<u8>,
    pub stats: DecodeStats,
}

impl Run {
    pub fn kind(&self) -> Option<mtdec::ErrorKind> {
        self.result.as_ref().err().map(|e| e.kind())
    }
}

pub fn decode_with<C: BlockCodec>(codec: &C, input: &[u8], props: &MtDecProps) -> Run {
    let mut src = input;
    let mut out = Vec::new();
    let mut stats = DecodeStats::default();
    let result = decode_mt(codec, &mut src, &mut out, props, None, &mut stats);
    Run { result, out, stats }
}

pub fn decode(input: &[u8], props: &MtDecProps) -> Run {
    decode_with(&MtdCodec::new(), input, props)
}

/// Reader that returns at most `step` bytes per call.
pub struct Trickle<'a> {
    pub data: &'a [u8],
    pub step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

/// Reader that fails once `ok_bytes` have been delivered.
pub struct FailingReader<'a> {
    pub data: &'a [u8],
    pub ok_bytes: usize,
}

impl Read for FailingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.ok_bytes == 0 {
            return Err(io::Error::other("disk gone"));
        }
        let n = buf.len().min(self.data.len()).min(self.ok_bytes);
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        self.ok_bytes -= n;
        Ok(n)
    }
}

/// Writer that refuses everything past `room` bytes.
pub struct FullDisk {
    pub taken: Vec<u8>,
    pub room: usize,
}

impl Write for FullDisk {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.taken.len() >= self.room {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "no space left"));
        }
        let n = buf.len().min(self.room - self.taken.len());
        self.taken.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// [`MtdCodec`] with faults injected by block index or slot.
#[derive(Default)]
pub struct FaultCodec {
    pub inner: MtdCodec,
    /// Blocks whose decoding fails with `Data("injected at N")`, after the
    /// given delay.
    pub fail_at: Vec<(u64, Duration)>,
    /// Block whose first output allocation fails with `Memory`.
    pub memory_once_at: Option<u64>,
    pub memory_fired: AtomicBool,
    /// Slot whose worker state cannot be created.
    pub no_coder_for_slot: Option<usize>,
}

pub struct FaultCoder {
    inner: MtdCoder,
}

impl BlockCodec for FaultCodec {
    type Coder = FaultCoder;
    type ReadState = FrameParser;
    type WriteState = FrameWriter;

    fn create_coder(&self, slot: usize) -> mtdec::Result<FaultCoder> {
        if self.no_coder_for_slot == Some(slot) {
            return Err(MtDecError::Threading(format!("no coder for slot {}", slot)));
        }
        Ok(FaultCoder { inner: self.inner.create_coder(slot)? })
    }

    fn create_read_state(&self) -> FrameParser {
        self.inner.create_read_state()
    }

    fn create_write_state(&self) -> FrameWriter {
        self.inner.create_write_state()
    }

    fn parse(&self, state: &mut FrameParser, coder: &mut FaultCoder, info: &ParseInfo<'_>) -> mtdec::Result<ParseOutcome> {
        self.inner.parse(state, &mut coder.inner, info)
    }

    fn pre_code(&self, coder: &mut FaultCoder, block: &BlockDescriptor) -> mtdec::Result<()> {
        if let Some(&(_, delay)) = self.fail_at.iter().find(|(i, _)| *i == block.index) {
            std::thread::sleep(delay);
            return Err(MtDecError::data(format!("injected at {}", block.index)));
        }
        if self.memory_once_at == Some(block.index) && !self.memory_fired.swap(true, Ordering::AcqRel) {
            return Err(MtDecError::Memory { requested: block.out_estimate as usize });
        }
        self.inner.pre_code(&mut coder.inner, block)
    }

    fn code(&self, coder: &mut FaultCoder, src: &[u8], src_finished: bool) -> mtdec::Result<CodeProgress> {
        self.inner.code(&mut coder.inner, src, src_finished)
    }

    fn write(&self, coder: &mut FaultCoder, state: &mut FrameWriter, req: WriteRequest<'_>) -> mtdec::Result<WriteOutcome> {
        self.inner.write(&mut coder.inner, state, req)
    }
}
