// Failures are reported by block order: the caller sees the error of the
// earliest failing block and the output holds exactly the blocks before it.

use std::time::Duration;

use mtdec::{decode_mt, DecodeStats, EngineState, ErrorKind, MtDecError, MtdCodec};

use super::fixtures::{
    block_offsets, decode, decode_with, props, sample, stored_frame, FailingReader, FaultCodec,
    FullDisk,
};

const BS: usize = 1024;

fn ten_blocks() -> (Vec<u8>, Vec<u8>) {
    let data = sample(10 * BS, 99);
    let input = stored_frame(&data, &[BS; 10]);
    (data, input)
}

#[test]
fn truncated_input_keeps_complete_blocks() {
    let (data, input) = ten_blocks();
    let cut = block_offsets(&input)[6] + 13 + 100;
    for threads in [1, 4] {
        let run = decode(&input[..cut], &props(threads, 256));
        assert_eq!(run.kind(), Some(ErrorKind::InputEof), "threads={}", threads);
        assert_eq!(run.out, &data[..6 * BS], "threads={}", threads);
        assert_eq!(run.stats.blocks, 6);
    }
}

#[test]
fn missing_content_checksum_is_input_eof() {
    let (data, input) = ten_blocks();
    for threads in [1, 4] {
        let run = decode(&input[..input.len() - 2], &props(threads, 4096));
        assert_eq!(run.kind(), Some(ErrorKind::InputEof));
        assert_eq!(run.out, data);
    }
}

#[test]
fn corrupt_block_stops_before_it() {
    let (data, mut input) = ten_blocks();
    let at = block_offsets(&input)[3] + 13 + 5;
    input[at] ^= 0x5A;
    for threads in [1, 2, 4, 8] {
        let run = decode(&input, &props(threads, 512));
        assert_eq!(run.kind(), Some(ErrorKind::Data), "threads={}", threads);
        assert_eq!(run.out, &data[..3 * BS], "threads={}", threads);
        assert_eq!(run.stats.final_state, EngineState::Error);
    }
}

#[test]
fn bad_magic_writes_nothing() {
    let (_, mut input) = ten_blocks();
    input[0] ^= 0xFF;
    for threads in [1, 4] {
        let run = decode(&input, &props(threads, 4096));
        assert_eq!(run.kind(), Some(ErrorKind::Data));
        assert!(run.out.is_empty());
    }
}

#[test]
fn unknown_method_in_block_two() {
    let (data, mut input) = ten_blocks();
    let off = block_offsets(&input)[2];
    input[off] = 9;
    for threads in [1, 4] {
        let run = decode(&input, &props(threads, 100));
        assert_eq!(run.kind(), Some(ErrorKind::Data));
        assert_eq!(run.out, &data[..2 * BS]);
    }
}

#[test]
fn earliest_failure_wins_even_when_noticed_last() {
    let data = sample(12 * BS, 5);
    let input = stored_frame(&data, &[BS; 12]);
    let codec = FaultCodec {
        fail_at: vec![(2, Duration::from_millis(80)), (5, Duration::ZERO)],
        ..FaultCodec::default()
    };
    for threads in [1, 8] {
        let run = decode_with(&codec, &input, &props(threads, 4096));
        match &run.result {
            Err(MtDecError::Data(msg)) => assert_eq!(msg, "injected at 2", "threads={}", threads),
            other => panic!("threads={}: unexpected {:?}", threads, other),
        }
        assert_eq!(run.out, &data[..2 * BS], "threads={}", threads);
    }
}

#[test]
fn progress_cancel_after_three_blocks() {
    let (data, input) = ten_blocks();
    for threads in [1, 4] {
        let mut calls = 0u32;
        let mut cb = |_in: u64, _out: u64| -> bool {
            calls += 1;
            calls < 3
        };
        let mut src: &[u8] = &input;
        let mut out = Vec::new();
        let mut stats = DecodeStats::default();
        let r = decode_mt(&MtdCodec::new(), &mut src, &mut out, &props(threads, 512), Some(&mut cb), &mut stats);
        assert_eq!(r.unwrap_err().kind(), ErrorKind::ProgressCancel);
        assert_eq!(calls, 3);
        assert_eq!(out, &data[..3 * BS]);
    }
}

#[test]
fn progress_sees_growing_totals() {
    let (data, input) = ten_blocks();
    let mut seen: Vec<u64> = Vec::new();
    let mut cb = |_in: u64, out: u64| -> bool {
        seen.push(out);
        true
    };
    let mut src: &[u8] = &input;
    let mut out = Vec::new();
    let mut stats = DecodeStats::default();
    decode_mt(&MtdCodec::new(), &mut src, &mut out, &props(4, 512), Some(&mut cb), &mut stats).unwrap();
    assert_eq!(out, data);
    assert_eq!(seen.len(), 11);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*seen.last().unwrap(), data.len() as u64);
}

#[test]
fn output_limit_truncates_cleanly() {
    let (data, input) = ten_blocks();
    for threads in [1, 4] {
        for limit in [0u64, 2048, 2500] {
            let mut p = props(threads, 700);
            p.out_size_limit = Some(limit);
            let run = decode(&input, &p);
            assert!(run.result.is_ok(), "threads={} limit={}: {:?}", threads, limit, run.result);
            assert_eq!(run.out, &data[..limit as usize]);
            assert!(run.stats.truncated);
            assert_eq!(run.stats.bytes_out, limit);
            assert_eq!(run.stats.final_state, EngineState::Done);
        }
    }
}

#[test]
fn limit_past_the_end_is_not_truncation() {
    let (data, input) = ten_blocks();
    let mut p = props(4, 4096);
    p.out_size_limit = Some(data.len() as u64);
    let run = decode(&input, &p);
    assert!(run.result.is_ok());
    assert_eq!(run.out, data);
    assert!(!run.stats.truncated);
}

#[test]
fn source_failure_is_read_error() {
    let (data, input) = ten_blocks();
    let ok_bytes = block_offsets(&input)[4] + 20;
    for threads in [1, 4] {
        let mut src = FailingReader { data: &input, ok_bytes };
        let mut out = Vec::new();
        let mut stats = DecodeStats::default();
        let r = decode_mt(&MtdCodec::new(), &mut src, &mut out, &props(threads, 4096), None, &mut stats);
        assert_eq!(r.unwrap_err().kind(), ErrorKind::Read);
        assert_eq!(out.len() % BS, 0);
        assert!(out.len() <= 4 * BS);
        assert_eq!(out, &data[..out.len()]);
    }
}

#[test]
fn sink_failure_is_write_error() {
    let (data, input) = ten_blocks();
    for threads in [1, 4] {
        let mut src: &[u8] = &input;
        let mut disk = FullDisk { taken: Vec::new(), room: 3000 };
        let mut stats = DecodeStats::default();
        let r = decode_mt(&MtdCodec::new(), &mut src, &mut disk, &props(threads, 512), None, &mut stats);
        assert_eq!(r.unwrap_err().kind(), ErrorKind::Write);
        assert_eq!(disk.taken, &data[..3000]);
    }
}

#[test]
fn checksums_can_be_skipped() {
    let (data, mut input) = ten_blocks();
    let at = block_offsets(&input)[3] + 13 + 5;
    input[at] ^= 0x01;
    let run = decode_with(&MtdCodec::without_checksums(), &input, &props(4, 512));
    assert!(run.result.is_ok());
    let mut expected = data.clone();
    expected[3 * BS + 5] ^= 0x01;
    assert_eq!(run.out, expected);
}
