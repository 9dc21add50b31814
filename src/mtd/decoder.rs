// decoder.rs — `BlockCodec` implementation for MTD frames.
//
// Block boundaries, as the engine sees them:
//
//   block 0   = frame header + first data block
//   block k   = one data block (header + payload)
//   end block = end mark [+ content checksum]
//
// The next frame of a concatenated stream starts a new block after the end
// block. The parser records each block's layout in the slot's coder; the
// coder skips the header bytes, expands the payload and checks the block
// checksum; the writer keeps the running content checksum of the frame.

use crate::engine::{
    BlockCodec, BlockDescriptor, CodeProgress, CodeStatus, ParseInfo, ParseOutcome, ParseState,
    WriteOutcome, WriteRequest,
};
use crate::error::{MtDecError, Result};
use crate::xxhash::{content_hasher, xxh32_oneshot, Xxh32State, MTD_SEED};

use super::format::{
    read_u32_le, BlockHeader, FrameHeader, Method, BLOCK_HEADER_SIZE, CHECKSUM_SIZE, END_MARK,
    FRAME_HEADER_SIZE,
};
use super::rle::RleDecoder;

// ── Parser (travels with canRead) ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    FrameHeader,
    BlockHeader,
    Payload { left: u64 },
    EndChecksum,
}

#[derive(Debug, Clone)]
pub struct FrameParser {
    phase: Phase,
    buf: [u8; BLOCK_HEADER_SIZE],
    have: usize,
    content_checksum: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        FrameParser {
            phase: Phase::FrameHeader,
            buf: [0; BLOCK_HEADER_SIZE],
            have: 0,
            content_checksum: false,
        }
    }
}

impl FrameParser {
    // Accumulates up to `want` header bytes; returns bytes taken from `src`.
    fn gather(&mut self, src: &[u8], want: usize) -> usize {
        let n = (want - self.have).min(src.len());
        self.buf[self.have..self.have + n].copy_from_slice(&src[..n]);
        self.have += n;
        n
    }
}

// ── Coder (one per worker slot) ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Unknown,
    Data(BlockHeader),
    End { checksum: Option<u32> },
}

#[derive(Debug)]
pub struct MtdCoder {
    layout: Layout,
    /// Set when this block opens a frame.
    frame: Option<FrameHeader>,
    header_len: usize,
    header_done: usize,
    payload_left: u64,
    rle: RleDecoder,
    out: Vec<u8>,
    done: bool,
}

impl MtdCoder {
    fn new() -> Self {
        MtdCoder {
            layout: Layout::Unknown,
            frame: None,
            header_len: 0,
            header_done: 0,
            payload_left: 0,
            rle: RleDecoder::default(),
            out: Vec::new(),
            done: false,
        }
    }

    fn begin_block(&mut self) {
        self.layout = Layout::Unknown;
        self.frame = None;
        self.header_len = 0;
        self.header_done = 0;
        self.payload_left = 0;
        self.rle.reset();
        self.out.clear();
        self.done = false;
    }

    fn estimate(&self) -> Option<u64> {
        match self.layout {
            Layout::Unknown => None,
            Layout::Data(h) => Some(h.unpacked_size as u64),
            Layout::End { .. } => Some(0),
        }
    }
}

// ── Writer (travels with canWrite) ──────────────────────────────────────────

#[derive(Default)]
pub struct FrameWriter {
    content: Option<Xxh32State>,
    // Every data block of the current frame went through the hasher.
    intact: bool,
    frames: u64,
}

impl FrameWriter {
    /// Frames closed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

// ── Codec ───────────────────────────────────────────────────────────────────

/// Decoder for MTD frames.
#[derive(Debug, Clone, Copy)]
pub struct MtdCodec {
    verify_checksums: bool,
}

impl Default for MtdCodec {
    fn default() -> Self {
        MtdCodec { verify_checksums: true }
    }
}

impl MtdCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips block and content checksum verification.
    pub fn without_checksums() -> Self {
        MtdCodec { verify_checksums: false }
    }
}

impl BlockCodec for MtdCodec {
    type Coder = MtdCoder;
    type ReadState = FrameParser;
    type WriteState = FrameWriter;

    fn create_coder(&self, _slot: usize) -> Result<MtdCoder> {
        Ok(MtdCoder::new())
    }

    fn create_read_state(&self) -> FrameParser {
        FrameParser::default()
    }

    fn create_write_state(&self) -> FrameWriter {
        FrameWriter::default()
    }

    fn parse(&self, p: &mut FrameParser, coder: &mut MtdCoder, info: &ParseInfo<'_>) -> Result<ParseOutcome> {
        if info.start_call {
            coder.begin_block();
        }
        let src = info.src;
        let mut pos = 0;
        while pos < src.len() {
            match p.phase {
                Phase::FrameHeader => {
                    let n = p.gather(&src[pos..], FRAME_HEADER_SIZE);
                    pos += n;
                    coder.header_len += n;
                    if p.have == FRAME_HEADER_SIZE {
                        let h = FrameHeader::decode(&p.buf[..FRAME_HEADER_SIZE])?;
                        p.content_checksum = h.content_checksum();
                        p.have = 0;
                        coder.frame = Some(h);
                        p.phase = Phase::BlockHeader;
                    }
                }
                Phase::BlockHeader if p.have == 0 && src[pos] == END_MARK => {
                    pos += 1;
                    coder.header_len += 1;
                    coder.layout = Layout::End { checksum: None };
                    if p.content_checksum {
                        p.phase = Phase::EndChecksum;
                    } else {
                        p.phase = Phase::FrameHeader;
                        return Ok(ParseOutcome { state: ParseState::End, consumed: pos, out_size_estimate: Some(0) });
                    }
                }
                Phase::BlockHeader => {
                    let n = p.gather(&src[pos..], BLOCK_HEADER_SIZE);
                    pos += n;
                    coder.header_len += n;
                    if p.have == BLOCK_HEADER_SIZE {
                        let h = BlockHeader::decode(&p.buf)?;
                        p.have = 0;
                        coder.layout = Layout::Data(h);
                        p.phase = Phase::Payload { left: h.packed_size as u64 };
                        let unpacked = h.unpacked_size as u64;
                        if info.block_limit.is_some_and(|limit| unpacked > limit) {
                            return Ok(ParseOutcome {
                                state: ParseState::Overflow,
                                consumed: pos,
                                out_size_estimate: Some(unpacked),
                            });
                        }
                    }
                }
                Phase::Payload { left } => {
                    let take = left.min((src.len() - pos) as u64);
                    pos += take as usize;
                    if take == left {
                        p.phase = Phase::BlockHeader;
                        return Ok(ParseOutcome {
                            state: ParseState::NewBlock,
                            consumed: pos,
                            out_size_estimate: coder.estimate(),
                        });
                    }
                    p.phase = Phase::Payload { left: left - take };
                }
                Phase::EndChecksum => {
                    let n = p.gather(&src[pos..], CHECKSUM_SIZE);
                    pos += n;
                    coder.header_len += n;
                    if p.have == CHECKSUM_SIZE {
                        coder.layout = Layout::End { checksum: Some(read_u32_le(&p.buf[..CHECKSUM_SIZE])) };
                        p.have = 0;
                        p.phase = Phase::FrameHeader;
                        return Ok(ParseOutcome { state: ParseState::End, consumed: pos, out_size_estimate: Some(0) });
                    }
                }
            }
        }
        Ok(ParseOutcome::cont(pos, coder.estimate()))
    }

    fn pre_code(&self, coder: &mut MtdCoder, _block: &BlockDescriptor) -> Result<()> {
        coder.out.clear();
        coder.rle.reset();
        coder.header_done = 0;
        coder.done = false;
        match coder.layout {
            Layout::Data(h) => {
                let want = h.unpacked_size as usize;
                let mut fresh = Vec::new();
                fresh
                    .try_reserve_exact(want)
                    .map_err(|_| MtDecError::Memory { requested: want })?;
                coder.out = fresh;
                coder.payload_left = h.packed_size as u64;
                Ok(())
            }
            Layout::End { .. } => Ok(()),
            Layout::Unknown => Err(MtDecError::data("block decoded before its header was parsed")),
        }
    }

    fn code(&self, coder: &mut MtdCoder, src: &[u8], src_finished: bool) -> Result<CodeProgress> {
        let skip = (coder.header_len - coder.header_done).min(src.len());
        coder.header_done += skip;
        let mut pos = skip;
        let before = coder.out.len();

        match coder.layout {
            Layout::Data(h) if coder.header_done == coder.header_len && !coder.done => {
                let take = coder.payload_left.min((src.len() - pos) as u64) as usize;
                let payload = &src[pos..pos + take];
                let limit = h.unpacked_size as usize;
                match h.method {
                    Method::Stored => {
                        if coder.out.len() + take > limit {
                            return Err(MtDecError::data("stored payload overflows block size"));
                        }
                        coder.out.extend_from_slice(payload);
                    }
                    Method::Rle => coder.rle.decode(payload, &mut coder.out, limit)?,
                }
                pos += take;
                coder.payload_left -= take as u64;
                if coder.payload_left == 0 {
                    if !coder.rle.is_clean() {
                        return Err(MtDecError::data("rle payload ends inside a pair"));
                    }
                    if coder.out.len() != limit {
                        return Err(MtDecError::data(format!(
                            "block decoded to {} bytes, header says {}",
                            coder.out.len(),
                            limit
                        )));
                    }
                    if self.verify_checksums && xxh32_oneshot(&coder.out, MTD_SEED) != h.checksum {
                        return Err(MtDecError::data("block checksum mismatch"));
                    }
                    coder.done = true;
                }
            }
            Layout::Data(_) => {}
            Layout::End { .. } => {
                if src_finished && coder.header_done == coder.header_len {
                    coder.done = true;
                }
            }
            Layout::Unknown => return Err(MtDecError::data("block decoded before its header was parsed")),
        }

        Ok(CodeProgress {
            in_consumed: pos,
            out_produced: coder.out.len() - before,
            status: if coder.done { CodeStatus::FinishedWithMark } else { CodeStatus::NotFinished },
        })
    }

    fn write(&self, coder: &mut MtdCoder, w: &mut FrameWriter, req: WriteRequest<'_>) -> Result<WriteOutcome> {
        if let Some(h) = coder.frame {
            w.content = (h.content_checksum() && self.verify_checksums).then(content_hasher);
            w.intact = true;
        }
        match coder.layout {
            Layout::Data(_) => {
                if req.need_write_to_stream {
                    req.sink.write_all(&coder.out).map_err(MtDecError::Write)?;
                    if let Some(hasher) = w.content.as_mut() {
                        hasher.update(&coder.out);
                    }
                } else {
                    w.intact = false;
                }
                // The engine's charge for this buffer ends with the write.
                coder.out = Vec::new();
                Ok(WriteOutcome { need_continue: false, can_recode: false })
            }
            Layout::End { checksum } => {
                let hasher = w.content.take();
                if req.need_write_to_stream && w.intact {
                    if let (Some(expected), Some(hasher)) = (checksum, hasher) {
                        if hasher.digest() != expected {
                            return Err(MtDecError::data("content checksum mismatch"));
                        }
                    }
                }
                w.frames += 1;
                Ok(WriteOutcome { need_continue: !req.extra.is_empty(), can_recode: true })
            }
            Layout::Unknown => Ok(WriteOutcome::default()),
        }
    }
}
