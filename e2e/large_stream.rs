// e2e/large_stream.rs — Multi-megabyte streams through files
//
// Encodes ~10 MiB with the parallel encoder, stores the frame in a temp file
// and decodes it back from the file with several thread counts and chunk
// sizes. Checks byte equality, that more than one worker took part, and
// that the in-flight memory stayed under the configured ceiling.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use mtdec::{decode_mt, encode_mt, DecodeStats, EncodeProps, Method, MtDecProps, MtdCodec};
use tempfile::NamedTempFile;

const LEN: usize = 10 * 1024 * 1024 + 12_345;

fn corpus() -> Vec<u8> {
    let mut x: u64 = 0x0123_4567_89AB_CDEF;
    let mut out = Vec::with_capacity(LEN);
    while out.len() < LEN {
        x ^= x << 7;
        x ^= x >> 9;
        let run = (x % 97) as usize + 1;
        if x & 1 == 0 {
            out.extend(std::iter::repeat((x >> 16) as u8).take(run));
        } else {
            out.extend((0..run).map(|i| (x >> (i % 56)) as u8));
        }
    }
    out.truncate(LEN);
    out
}

fn encode_file(data: &[u8], block_size: usize) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let mut w = BufWriter::new(file.reopen().unwrap());
    let props = EncodeProps { block_size, nb_workers: 4, method: Method::Rle, content_checksum: true };
    let mut src = data;
    let stats = encode_mt(&mut src, &mut w, &props).unwrap();
    w.flush().unwrap();
    assert_eq!(stats.bytes_in, data.len() as u64);
    file
}

fn decode_file(file: &NamedTempFile, props: &MtDecProps) -> (Vec<u8>, DecodeStats) {
    let mut src = BufReader::new(File::open(file.path()).unwrap());
    let mut out = Vec::with_capacity(LEN);
    let mut stats = DecodeStats::default();
    decode_mt(&MtdCodec::new(), &mut src, &mut out, props, None, &mut stats).unwrap();
    (out, stats)
}

#[test]
fn ten_megabytes_four_threads() {
    let data = corpus();
    let file = encode_file(&data, 256 * 1024);
    let mut props = MtDecProps::default();
    props.set_num_threads(4);
    props.set_in_buf_size(64 * 1024);
    props.mem_use_max = 8 * 1024 * 1024;

    let (out, stats) = decode_file(&file, &props);
    assert!(out == data, "decoded output differs");
    assert!(stats.multi_thread_used);
    assert_eq!(stats.fallback, None);
    assert!(stats.peak_memory <= props.mem_use_max);
    assert_eq!(stats.bytes_in, file.as_file().metadata().unwrap().len());
}

#[test]
fn thread_counts_agree_on_large_input() {
    let data = corpus();
    let file = encode_file(&data, 1024 * 1024);
    let mut reference: Option<Vec<u8>> = None;
    for threads in [1, 2, 8] {
        let mut props = MtDecProps::default();
        props.set_num_threads(threads);
        props.set_in_buf_size(100_000);
        let (out, _) = decode_file(&file, &props);
        match &reference {
            None => reference = Some(out),
            Some(r) => assert!(*r == out, "threads={} differs", threads),
        }
    }
    assert!(reference.unwrap() == data);
}

#[test]
fn encoder_output_is_independent_of_workers() {
    let data = corpus();
    let mut frames = Vec::new();
    for nb_workers in [1, 3, 8] {
        let props = EncodeProps { block_size: 512 * 1024, nb_workers, method: Method::Rle, content_checksum: true };
        let mut src: &[u8] = &data;
        let mut out = Vec::new();
        encode_mt(&mut src, &mut out, &props).unwrap();
        frames.push(out);
    }
    assert!(frames.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn low_memory_ceiling_still_decodes() {
    let data = corpus();
    let file = encode_file(&data, 1024 * 1024);
    let mut props = MtDecProps::default();
    props.set_num_threads(6);
    props.set_in_buf_size(32 * 1024);
    props.mem_use_max = 512 * 1024;

    let (out, stats) = decode_file(&file, &props);
    assert!(out == data, "decoded output differs");
    assert_eq!(stats.fallback, Some(mtdec::CollapseReason::Overflow));
}
