// e2e/cli_integration.rs — CLI integration tests
//
// Drives the `mtdec` binary as a black box with std::process::Command:
// compress / decompress round trips, stdin / stdout piping, output naming,
// overwrite protection, `test`, size limits and exit codes.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn mtdec_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_mtdec"))
}

fn payload(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x9E37_79B9;
    (0..len)
        .map(|i| {
            if (i / 512) % 2 == 0 {
                (i / 512) as u8
            } else {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            }
        })
        .collect()
}

fn setup(content: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.bin");
    fs::write(&input, content).unwrap();
    (dir, input)
}

fn run(args: &[&str]) -> Output {
    Command::new(mtdec_bin()).args(args).output().expect("spawn mtdec")
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

// ── Round trips ──────────────────────────────────────────────────────────────

#[test]
fn compress_then_decompress_with_derived_names() {
    let data = payload(200_000);
    let (dir, input) = setup(&data);

    let out = run(&["compress", "-B", "16K", path(&input)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let packed = dir.path().join("input.bin.mtd");
    assert!(packed.exists());

    fs::remove_file(&input).unwrap();
    let out = run(&["decompress", "-T", "4", "--in-buf", "4K", path(&packed)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(fs::read(&input).unwrap(), data);

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Decoded 200000 bytes"), "{}", stderr);
    assert!(stderr.contains("mt: yes"), "{}", stderr);
}

#[test]
fn single_thread_reports_mt_no() {
    let data = payload(50_000);
    let (dir, input) = setup(&data);
    let packed = dir.path().join("p.mtd");
    let restored = dir.path().join("r.bin");
    assert!(run(&["compress", path(&input), "-o", path(&packed)]).status.success());
    let out = run(&["decompress", "-T", "1", path(&packed), "-o", path(&restored)]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("mt: no"));
    assert_eq!(fs::read(&restored).unwrap(), data);
}

#[test]
fn stdin_to_stdout_pipes() {
    let data = payload(80_000);

    let mut child = Command::new(mtdec_bin())
        .args(["-q", "compress", "--method", "stored", "-B", "8K"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let feed = data.clone();
    let writer = std::thread::spawn(move || stdin.write_all(&feed).unwrap());
    let packed = child.wait_with_output().unwrap();
    writer.join().unwrap();
    assert!(packed.status.success());
    assert!(packed.stdout.len() > data.len());

    let mut child = Command::new(mtdec_bin())
        .args(["-q", "decompress", "-T", "3", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let frame = packed.stdout.clone();
    let writer = std::thread::spawn(move || stdin.write_all(&frame).unwrap());
    let restored = child.wait_with_output().unwrap();
    writer.join().unwrap();
    assert!(restored.status.success());
    assert_eq!(restored.stdout, data);
    assert!(restored.stderr.is_empty(), "-q must silence the summary");
}

#[test]
fn decompress_to_stdout_flag() {
    let data = payload(10_000);
    let (dir, input) = setup(&data);
    let packed = dir.path().join("x.mtd");
    assert!(run(&["compress", path(&input), "-o", path(&packed)]).status.success());
    let out = run(&["decompress", "-c", path(&packed)]);
    assert!(out.status.success());
    assert_eq!(out.stdout, data);
}

// ── Output handling ──────────────────────────────────────────────────────────

#[test]
fn existing_output_needs_force() {
    let data = payload(5_000);
    let (dir, input) = setup(&data);
    let packed = dir.path().join("input.bin.mtd");
    fs::write(&packed, b"keep me").unwrap();

    let out = run(&["compress", path(&input)]);
    assert!(!out.status.success());
    assert_eq!(fs::read(&packed).unwrap(), b"keep me");

    let out = run(&["compress", "-f", path(&input)]);
    assert!(out.status.success());
    assert_ne!(fs::read(&packed).unwrap(), b"keep me");
}

#[test]
fn decompress_without_extension_needs_output() {
    let (_dir, input) = setup(b"not a frame");
    let out = run(&["decompress", path(&input)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown suffix"));
}

#[test]
fn limit_truncates_output() {
    let data = payload(30_000);
    let (dir, input) = setup(&data);
    let packed = dir.path().join("l.mtd");
    assert!(run(&["compress", "-B", "4K", path(&input), "-o", path(&packed)]).status.success());
    let out = run(&["decompress", "--limit", "10000", "-c", path(&packed)]);
    assert!(out.status.success());
    assert_eq!(out.stdout, &data[..10_000]);
    assert!(String::from_utf8_lossy(&out.stderr).contains("size limit"));
}

// ── test sub-command ─────────────────────────────────────────────────────────

#[test]
fn test_accepts_good_and_rejects_corrupt() {
    let data = payload(40_000);
    let (dir, input) = setup(&data);
    let packed = dir.path().join("t.mtd");
    assert!(run(&["compress", "--method", "stored", path(&input), "-o", path(&packed)]).status.success());

    let out = run(&["test", "-T", "4", path(&packed)]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("OK"));

    let mut frame = fs::read(&packed).unwrap();
    let mid = frame.len() / 2;
    frame[mid] ^= 0x40;
    fs::write(&packed, &frame).unwrap();
    let out = run(&["test", "-T", "4", path(&packed)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("decoding failed"));

    let out = run(&["test", "--no-check", path(&packed)]);
    assert!(out.status.success(), "stored payload damage goes unnoticed without checksums");
}

#[test]
fn failed_decode_removes_partial_output() {
    let data = payload(40_000);
    let (dir, input) = setup(&data);
    let packed = dir.path().join("c.mtd");
    assert!(run(&["compress", path(&input), "-o", path(&packed)]).status.success());
    let mut frame = fs::read(&packed).unwrap();
    frame.truncate(frame.len() - 10);
    fs::write(&packed, &frame).unwrap();

    let restored = dir.path().join("c");
    let out = run(&["decompress", path(&packed)]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!restored.exists());
}

#[test]
fn bad_arguments_fail() {
    assert!(!run(&["decompress", "--in-buf", "lots"]).status.success());
    assert!(!run(&["frobnicate"]).status.success());
    assert!(run(&["--version"]).status.success());
}
