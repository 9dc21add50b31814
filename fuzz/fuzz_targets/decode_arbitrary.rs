#![no_main]
use libfuzzer_sys::fuzz_target;

use mtdec::{decode_frame_to_vec, decode_mt, DecodeStats, MtDecProps, MtdCodec};

fn run(data: &[u8], threads: usize, in_buf: usize) -> (bool, Vec<u8>) {
    let mut props = MtDecProps::default();
    props.set_num_threads(threads);
    props.set_in_buf_size(in_buf);
    props.mem_use_max = 4 * 1024 * 1024;
    let mut src = data;
    let mut out = Vec::new();
    let mut stats = DecodeStats::default();
    let ok = decode_mt(&MtdCodec::new(), &mut src, &mut out, &props, None, &mut stats).is_ok();
    (ok, out)
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic, and the thread count must not change
    // what reaches the output.
    let (ok1, out1) = run(data, 1, 64);
    let (ok4, out4) = run(data, 4, 37);
    assert_eq!(ok1, ok4);
    assert_eq!(out1, out4);

    if let Ok(expected) = decode_frame_to_vec(data) {
        assert!(ok1);
        assert_eq!(out1, expected);
    }
});
