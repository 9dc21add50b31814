// Streams that continue past an end block: concatenated frames and
// trailing data.

use mtdec::mtd::FrameBuilder;
use mtdec::{decode_frame_to_vec, CollapseReason, ErrorKind, Method};

use super::fixtures::{decode, frame, props, sample, stored_frame};

#[test]
fn concatenated_frames_decode_in_order() {
    let a = sample(5_000, 1);
    let b = sample(12_345, 2);
    let c = sample(3_000, 3);
    let mut input = frame(&a, 1024);
    input.extend_from_slice(&frame(&b, 2048));
    input.extend_from_slice(&FrameBuilder::new(false).finish());
    input.extend_from_slice(&frame(&c, 1024));

    let expected: Vec<u8> = [a, b, c].concat();
    assert_eq!(decode_frame_to_vec(&input).unwrap(), expected);
    for threads in [1, 2, 4, 8] {
        for in_buf in [16, 4096] {
            let run = decode(&input, &props(threads, in_buf));
            assert!(run.result.is_ok(), "threads={} in_buf={}: {:?}", threads, in_buf, run.result);
            assert_eq!(run.out, expected, "threads={} in_buf={}", threads, in_buf);
        }
    }
}

#[test]
fn mixed_checksum_flags() {
    let a = sample(3_000, 8);
    let b = sample(3_000, 9);
    let mut f1 = FrameBuilder::new(false);
    f1.push_block(&a, Method::Rle);
    let mut f2 = FrameBuilder::new(true);
    f2.push_block(&b, Method::Stored);
    let mut input = f1.finish();
    input.extend_from_slice(&f2.finish());
    for threads in [1, 3] {
        let run = decode(&input, &props(threads, 64));
        assert_eq!(run.out, [a.clone(), b.clone()].concat());
    }
}

#[test]
fn trailing_garbage_after_a_frame() {
    let data = sample(4_000, 10);
    let mut input = frame(&data, 1024);
    input.extend_from_slice(b"garbage!");
    for threads in [1, 4] {
        let run = decode(&input, &props(threads, 1024));
        assert_eq!(run.kind(), Some(ErrorKind::Data), "threads={}", threads);
        assert_eq!(run.out, data, "threads={}", threads);
    }
}

#[test]
fn partial_second_frame_header() {
    let data = sample(4_000, 11);
    let mut input = frame(&data, 1024);
    input.extend_from_slice(&frame(&[], 1024)[..3]);
    for threads in [1, 4] {
        let run = decode(&input, &props(threads, 1024));
        assert_eq!(run.kind(), Some(ErrorKind::InputEof));
        assert_eq!(run.out, data);
    }
}

#[test]
fn collapse_inside_the_second_frame() {
    let a = sample(8 * 1024, 12);
    let b = sample(150_000, 13);
    let mut input = stored_frame(&a, &[1024; 8]);
    input.extend_from_slice(&stored_frame(&b, &[1024, 1024, 147_952]));
    let mut p = props(4, 1024);
    p.mem_use_max = 64 * 1024;
    let run = decode(&input, &p);
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.out, [a, b].concat());
    assert_eq!(run.stats.fallback, Some(CollapseReason::Overflow));
}
