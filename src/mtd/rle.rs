//! Byte run-length coding: a payload is a list of `(run - 1, byte)` pairs.

use crate::error::{MtDecError, Result};

/// Encodes `src` as run pairs.
pub fn encode(src: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(src.len() / 2 + 2);
    let mut i = 0;
    while i < src.len() {
        let b = src[i];
        let mut run = 1;
        while run < 256 && i + run < src.len() && src[i + run] == b {
            run += 1;
        }
        out.push((run - 1) as u8);
        out.push(b);
        i += run;
    }
    out
}

/// Incremental decoder; a pair may be split across calls.
#[derive(Debug, Default, Clone)]
pub struct RleDecoder {
    pending_run: Option<u8>,
}

impl RleDecoder {
    pub fn reset(&mut self) {
        self.pending_run = None;
    }

    /// No half pair is waiting.
    pub fn is_clean(&self) -> bool {
        self.pending_run.is_none()
    }

    /// Appends the expansion of `src` to `out`, never past `limit` bytes total.
    pub fn decode(&mut self, src: &[u8], out: &mut Vec<u8>, limit: usize) -> Result<()> {
        let mut it = src.iter().copied();
        loop {
            let run = match self.pending_run.take() {
                Some(r) => r,
                None => match it.next() {
                    Some(r) => r,
                    None => return Ok(()),
                },
            };
            let byte = match it.next() {
                Some(b) => b,
                None => {
                    self.pending_run = Some(run);
                    return Ok(());
                }
            };
            let n = run as usize + 1;
            if out.len() + n > limit {
                return Err(MtDecError::data("rle run overflows block size"));
            }
            out.resize(out.len() + n, byte);
        }
    }
}
