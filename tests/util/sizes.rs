// Integration tests for util/io.rs — size parsing / formatting and
// short-read tolerant reads.

use std::io::{self, Read};

use mtdec::util::{format_size, parse_size, read_to_capacity, KB, MB};

#[test]
fn parse_size_suffixes() {
    assert_eq!(parse_size("4096"), Ok(4096));
    assert_eq!(parse_size("64K"), Ok(64 * KB as u64));
    assert_eq!(parse_size("64kib"), Ok(64 * KB as u64));
    assert_eq!(parse_size("4M"), Ok(4 * MB as u64));
    assert_eq!(parse_size(" 1G "), Ok(1 << 30));
    assert!(parse_size("").is_err());
    assert!(parse_size("K").is_err());
    assert!(parse_size("12Q").is_err());
    assert!(parse_size("99999999999999999999G").is_err());
}

#[test]
fn format_size_units() {
    assert_eq!(format_size(999), "999 B");
    assert_eq!(format_size(1536), "1.50 KiB");
    assert_eq!(format_size(5 * MB as u64), "5.00 MiB");
}

struct OneByte<'a>(&'a [u8]);

impl Read for OneByte<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.0.is_empty() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.0[0];
        self.0 = &self.0[1..];
        Ok(1)
    }
}

#[test]
fn read_to_capacity_fills_across_short_reads() {
    let data = b"0123456789";
    let mut r = OneByte(data);
    let mut buf = [0u8; 6];
    assert_eq!(read_to_capacity(&mut r, &mut buf).unwrap(), 6);
    assert_eq!(&buf, b"012345");
    assert_eq!(read_to_capacity(&mut r, &mut buf).unwrap(), 4);
    assert_eq!(&buf[..4], b"6789");
    assert_eq!(read_to_capacity(&mut r, &mut buf).unwrap(), 0);
}
