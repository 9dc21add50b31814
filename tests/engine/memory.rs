// Memory ceiling, overflow hand-over and resource-failure fallbacks.

use mtdec::{CollapseReason, EngineState, ErrorKind};

use super::fixtures::{decode, decode_with, frame, props, sample, stored_frame, FaultCodec};

const BS: usize = 1024;

#[test]
fn in_flight_memory_stays_under_the_ceiling() {
    let data = sample(64 * BS, 1);
    let input = stored_frame(&data, &[BS; 64]);
    let mut p = props(8, BS);
    p.mem_use_max = 16 * 1024;
    let run = decode(&input, &p);
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.out, data);
    assert!(run.stats.peak_memory > 0);
    assert!(run.stats.peak_memory <= p.mem_use_max, "peak {}", run.stats.peak_memory);
    assert_eq!(run.stats.fallback, None);
}

#[test]
fn ceiling_for_a_single_block_still_completes() {
    let data = sample(40 * BS, 9);
    let input = stored_frame(&data, &[BS; 40]);
    // One 2 KiB input chunk plus one block of output.
    for threads in [2, 4, 8] {
        let mut p = props(threads, 2 * BS);
        p.mem_use_max = 3 * BS as u64;
        let run = decode(&input, &p);
        assert!(run.result.is_ok(), "threads={}: {:?}", threads, run.result);
        assert_eq!(run.out, data, "threads={}", threads);
        assert_eq!(run.stats.fallback, None, "threads={}", threads);
        assert!(run.stats.peak_memory <= p.mem_use_max, "peak {}", run.stats.peak_memory);
        assert_eq!(run.stats.blocks, 41);
    }
}

#[test]
fn oversized_first_block_goes_single_thread() {
    let data = sample(200_000, 2);
    let input = frame(&data, 64 * 1024);
    let mut p = props(4, 4096);
    p.mem_use_max = 8 * 1024;
    let run = decode(&input, &p);
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.out, data);
    assert_eq!(run.stats.fallback, Some(CollapseReason::Overflow));
    assert!(!run.stats.multi_thread_used);
    assert_eq!(run.stats.final_state, EngineState::Done);
}

#[test]
fn oversized_block_mid_stream_keeps_earlier_output() {
    let mut sizes = vec![BS; 6];
    sizes.push(100_000);
    sizes.extend([BS; 4]);
    let data = sample(sizes.iter().sum(), 3);
    let input = stored_frame(&data, &sizes);
    for in_buf in [100, BS, 8 * BS] {
        let mut p = props(4, in_buf);
        p.mem_use_max = 32 * 1024;
        let run = decode(&input, &p);
        assert!(run.result.is_ok(), "in_buf={}: {:?}", in_buf, run.result);
        assert_eq!(run.out, data, "in_buf={}", in_buf);
        assert_eq!(run.stats.fallback, Some(CollapseReason::Overflow));
        assert!(run.stats.multi_thread_used);
        assert_eq!(run.stats.blocks, 12);
    }
}

#[test]
fn allocation_failure_is_retried_then_single_thread() {
    let data = sample(16 * BS, 4);
    let input = stored_frame(&data, &[BS; 16]);
    let codec = FaultCodec { memory_once_at: Some(2), ..FaultCodec::default() };
    let run = decode_with(&codec, &input, &props(4, 4096));
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.out, data);
    assert_eq!(run.stats.fallback, Some(CollapseReason::Memory));
}

#[test]
fn allocation_failure_on_one_thread_is_reported() {
    let data = sample(8 * BS, 4);
    let input = stored_frame(&data, &[BS; 8]);
    let codec = FaultCodec { memory_once_at: Some(2), ..FaultCodec::default() };
    let run = decode_with(&codec, &input, &props(1, 4096));
    assert_eq!(run.kind(), Some(ErrorKind::Memory));
    assert_eq!(run.out, &data[..2 * BS]);
}

#[test]
fn worker_setup_failure_hands_over() {
    let data = sample(20 * BS, 6);
    let input = stored_frame(&data, &[BS; 20]);
    let codec = FaultCodec { no_coder_for_slot: Some(2), ..FaultCodec::default() };
    let run = decode_with(&codec, &input, &props(4, 512));
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(run.out, data);
    assert_eq!(run.stats.fallback, Some(CollapseReason::Threading));
    assert_eq!(run.stats.threads_started, 2);
}

#[test]
fn no_worker_state_at_all_is_threading_error() {
    let data = sample(4 * BS, 6);
    let input = stored_frame(&data, &[BS; 4]);
    let codec = FaultCodec { no_coder_for_slot: Some(0), ..FaultCodec::default() };
    for threads in [1, 4] {
        let run = decode_with(&codec, &input, &props(threads, 512));
        assert_eq!(run.kind(), Some(ErrorKind::Threading));
        assert!(run.out.is_empty());
    }
}
