//! I/O helpers.

use std::io::{self, Read};

use super::{GB, KB, MB};

/// Fills `buf` from `reader`, looping over short reads. Returns the number of
/// bytes read; less than `buf.len()` only at end of stream.
pub fn read_to_capacity<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Parses a size such as `4096`, `64K`, `64KB`, `4M`, `4MiB` or `1G`.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    if digits.is_empty() {
        return Err(format!("invalid size '{}'", s));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid size '{}'", s))?;
    let mult = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" | "KIB" => KB as u64,
        "M" | "MB" | "MIB" => MB as u64,
        "G" | "GB" | "GIB" => GB as u64,
        other => return Err(format!("unknown size suffix '{}'", other)),
    };
    value
        .checked_mul(mult)
        .ok_or_else(|| format!("size '{}' is too large", s))
}

/// Formats a byte count with a binary unit, e.g. `12.50 MiB`.
pub fn format_size(bytes: u64) -> String {
    let b = bytes as f64;
    if bytes >= GB as u64 {
        format!("{:.2} GiB", b / GB as f64)
    } else if bytes >= MB as u64 {
        format!("{:.2} MiB", b / MB as f64)
    } else if bytes >= KB as u64 {
        format!("{:.2} KiB", b / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
