//! Bytes read past the end of a block.
//!
//! The worker that finds a block boundary in the middle of a chunk stashes the
//! tail here; the carry travels with the read token and becomes the first
//! input of the next block. It never holds more than one chunk.

#[derive(Debug, Default)]
pub struct CrossBlockCarry {
    buf: Vec<u8>,
}

impl CrossBlockCarry {
    pub fn new() -> Self {
        CrossBlockCarry { buf: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Stores `tail`. The carry must have been taken since the last stash.
    pub fn stash(&mut self, tail: &[u8]) {
        debug_assert!(self.buf.is_empty(), "carry stashed twice");
        self.buf.extend_from_slice(tail);
    }

    /// Hands the stored bytes over, leaving the carry empty.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    /// Replaces the contents with a caller-owned buffer.
    pub fn replace(&mut self, buf: Vec<u8>) {
        debug_assert!(self.buf.is_empty(), "carry replaced while holding data");
        self.buf = buf;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stash_then_take_empties() {
        let mut c = CrossBlockCarry::new();
        c.stash(b"tail");
        assert_eq!(c.len(), 4);
        assert_eq!(c.take(), b"tail");
        assert!(c.is_empty());
        assert!(c.take().is_empty());
    }

    #[test]
    fn empty_tail_is_allowed() {
        let mut c = CrossBlockCarry::new();
        c.stash(&[]);
        assert!(c.is_empty());
    }
}
