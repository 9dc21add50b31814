//! E2E: error handling and damaged input
//!
//! - Damaged frames never panic, and every thread count produces the same
//!   output prefix and the same success or failure as the reference decoder.
//! - Corruption deep inside a large file stops the output exactly at the
//!   damaged block.
//! - Non-MTD input is rejected without output.

use std::io::{BufReader, Write};

use mtdec::mtd::format::{BlockHeader, BLOCK_HEADER_SIZE, END_MARK, FRAME_HEADER_SIZE};
use mtdec::{
    decode_frame_to_vec, decode_mt, encode_to_vec, DecodeStats, EncodeProps, ErrorKind, Method,
    MtDecProps, MtdCodec,
};
use tempfile::NamedTempFile;

struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

fn data(len: usize, seed: u32) -> Vec<u8> {
    let mut rng = XorShift(seed | 1);
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let r = rng.next();
        let n = (r % 40) as usize + 1;
        if r & 4 == 0 {
            out.extend(std::iter::repeat(r as u8).take(n));
        } else {
            out.extend((0..n).map(|_| rng.next() as u8));
        }
    }
    out.truncate(len);
    out
}

fn props(threads: usize, in_buf: usize) -> MtDecProps {
    let mut p = MtDecProps::default();
    p.set_num_threads(threads);
    p.set_in_buf_size(in_buf);
    p
}

fn decode(input: &[u8], p: &MtDecProps) -> (mtdec::Result<()>, Vec<u8>) {
    let mut src = input;
    let mut out = Vec::new();
    let mut stats = DecodeStats::default();
    let r = decode_mt(&MtdCodec::new(), &mut src, &mut out, p, None, &mut stats);
    (r, out)
}

// ═════════════════════════════════════════════════════════════════════════════
// Damaged frames
// ═════════════════════════════════════════════════════════════════════════════

#[test]
fn damaged_frames_agree_across_thread_counts() {
    let clean = data(6_000, 77);
    let enc = EncodeProps { block_size: 1024, nb_workers: 2, method: Method::Rle, content_checksum: true };
    let frame = encode_to_vec(&clean, &enc).unwrap();
    let mut rng = XorShift(12345);

    for round in 0..300 {
        let mut damaged = frame.clone();
        let flips = 1 + (rng.next() % 3) as usize;
        for _ in 0..flips {
            let at = rng.next() as usize % damaged.len();
            damaged[at] ^= 1 << (rng.next() % 8);
        }
        if round % 5 == 0 {
            let keep = rng.next() as usize % damaged.len();
            damaged.truncate(keep);
        }

        let reference = decode_frame_to_vec(&damaged);
        let (r1, out1) = decode(&damaged, &props(1, 64));
        let (r4, out4) = decode(&damaged, &props(4, 64));

        assert_eq!(out1, out4, "round {}", round);
        assert_eq!(r1.is_ok(), r4.is_ok(), "round {}: {:?} vs {:?}", round, r1, r4);
        assert_eq!(r1.is_ok(), reference.is_ok(), "round {}: {:?} vs {:?}", round, r1, reference);
        if let Ok(expected) = reference {
            assert_eq!(out1, expected, "round {}", round);
        }
        assert!(clean.starts_with(&out1) || r1.is_ok(), "round {}: output is not a prefix", round);
    }
}

#[test]
fn corruption_deep_in_a_large_file() {
    const BS: usize = 64 * 1024;
    let clean = data(32 * BS, 5);
    let enc = EncodeProps { block_size: BS, nb_workers: 4, method: Method::Stored, content_checksum: true };
    let mut frame = encode_to_vec(&clean, &enc).unwrap();

    // Locate data block 17 and damage its payload.
    let mut pos = FRAME_HEADER_SIZE;
    for _ in 0..17 {
        let h = BlockHeader::decode(&frame[pos..pos + BLOCK_HEADER_SIZE]).unwrap();
        pos += BLOCK_HEADER_SIZE + h.packed_size as usize;
    }
    assert_ne!(frame[pos], END_MARK);
    frame[pos + BLOCK_HEADER_SIZE + 1000] ^= 0xFF;

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&frame).unwrap();
    file.flush().unwrap();

    for threads in [1, 6] {
        let mut src = BufReader::new(file.reopen().unwrap());
        let mut out = Vec::new();
        let mut stats = DecodeStats::default();
        let r = decode_mt(&MtdCodec::new(), &mut src, &mut out, &props(threads, 16 * 1024), None, &mut stats);
        assert_eq!(r.unwrap_err().kind(), ErrorKind::Data);
        assert!(out == clean[..17 * BS], "threads={}: wrong prefix ({} bytes)", threads, out.len());
        assert_eq!(stats.blocks, 17);
    }
}

#[test]
fn plain_text_is_not_a_frame() {
    let text = b"This is just a text file, definitely not an MTD frame.\n".repeat(100);
    for threads in [1, 4] {
        let (r, out) = decode(&text, &props(threads, 1024));
        assert_eq!(r.unwrap_err().kind(), ErrorKind::Data);
        assert!(out.is_empty());
    }
}

#[test]
fn error_messages_are_readable() {
    let text = b"nope nope nope";
    let (r, _) = decode(text, &props(1, 1024));
    let msg = r.unwrap_err().to_string();
    assert!(msg.contains("magic"), "{}", msg);
}
