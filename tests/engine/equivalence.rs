// Output of the engine does not depend on the thread count or on how the
// input is sliced into chunks.

use mtdec::mtd::FrameBuilder;
use mtdec::{decode_frame_to_vec, decode_mt, DecodeStats, EngineState, Method, MtdCodec};

use super::fixtures::{block_offsets, decode, frame, props, sample, stored_frame, Trickle};

#[test]
fn same_output_for_every_thread_count() {
    let data = sample(40_000, 7);
    let input = frame(&data, 1024);
    assert_eq!(decode_frame_to_vec(&input).unwrap(), data);

    for threads in [1, 2, 3, 4, 8] {
        for in_buf in [16, 333, 4096, 1 << 20] {
            let run = decode(&input, &props(threads, in_buf));
            assert!(run.result.is_ok(), "threads={} in_buf={}: {:?}", threads, in_buf, run.result);
            assert_eq!(run.out, data, "threads={} in_buf={}", threads, in_buf);
            assert_eq!(run.stats.bytes_out, data.len() as u64);
            assert_eq!(run.stats.bytes_in, input.len() as u64);
            assert_eq!(run.stats.final_state, EngineState::Done);
        }
    }
}

#[test]
fn one_thread_never_spawns() {
    let data = sample(10_000, 3);
    let run = decode(&frame(&data, 1024), &props(1, 4096));
    assert_eq!(run.out, data);
    assert!(!run.stats.multi_thread_used);
    assert_eq!(run.stats.threads_started, 0);
    assert_eq!(run.stats.fallback, None);
}

#[test]
fn many_blocks_use_several_threads() {
    let data = sample(64 * 1024, 11);
    let input = frame(&data, 1024);
    let run = decode(&input, &props(4, 4096));
    assert_eq!(run.out, data);
    assert!(run.stats.multi_thread_used);
    assert!(run.stats.threads_started >= 2 && run.stats.threads_started <= 4);
    // 64 data blocks plus the end block.
    assert_eq!(run.stats.blocks, 65);
    assert_eq!(run.stats.fallback, None);
}

#[test]
fn short_reads_from_the_source() {
    let data = sample(20_000, 5);
    let input = frame(&data, 2048);
    for step in [1, 7, 1000] {
        let mut src = Trickle { data: &input, step };
        let mut out = Vec::new();
        let mut stats = DecodeStats::default();
        decode_mt(&MtdCodec::new(), &mut src, &mut out, &props(4, 512), None, &mut stats).unwrap();
        assert_eq!(out, data, "step={}", step);
    }
}

#[test]
fn uneven_block_sizes() {
    let sizes = [1, 2, 4000, 1, 17, 3000, 1979, 1, 1];
    let data = sample(sizes.iter().sum(), 21);
    let mut fb = FrameBuilder::new(true);
    let mut pos = 0;
    for (i, &n) in sizes.iter().enumerate() {
        let m = if i % 2 == 0 { Method::Rle } else { Method::Stored };
        fb.push_block(&data[pos..pos + n], m);
        pos += n;
    }
    let input = fb.finish();
    for threads in [1, 3, 6] {
        let run = decode(&input, &props(threads, 64));
        assert_eq!(run.out, data, "threads={}", threads);
    }
}

#[test]
fn empty_frame() {
    let input = FrameBuilder::new(true).finish();
    for threads in [1, 4] {
        let run = decode(&input, &props(threads, 16));
        assert!(run.result.is_ok());
        assert!(run.out.is_empty());
        assert_eq!(run.stats.blocks, 1);
    }
}

#[test]
fn empty_input_is_input_eof() {
    for threads in [1, 4] {
        let run = decode(&[], &props(threads, 1024));
        assert_eq!(run.kind(), Some(mtdec::ErrorKind::InputEof), "threads={}", threads);
        assert_eq!(run.stats.final_state, EngineState::Error);
    }
}

#[test]
fn repeated_runs_agree() {
    let data = sample(30 * 1024, 33);
    let good = stored_frame(&data, &[1024; 30]);
    let mut bad = good.clone();
    bad[block_offsets(&good)[11] + 13 + 40] ^= 0x10;

    for input in [&good, &bad] {
        for threads in [2, 5] {
            let first = decode(input, &props(threads, 700));
            let second = decode(input, &props(threads, 700));
            assert_eq!(first.out, second.out, "threads={}", threads);
            assert_eq!(first.kind(), second.kind(), "threads={}", threads);
            assert_eq!(first.stats.blocks, second.stats.blocks, "threads={}", threads);
        }
    }
    let run = decode(&bad, &props(4, 700));
    assert_eq!(run.kind(), Some(mtdec::ErrorKind::Data));
    assert_eq!(run.out, &data[..11 * 1024]);
}
