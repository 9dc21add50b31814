// ring.rs — The two token rings.
//
// Each worker slot owns one single-capacity mailbox per token. A token is
// passed by sending it to the next slot's mailbox, so at most one slot holds
// canRead and at most one holds canWrite at any instant; the payload of the
// token is the state that must stay sequential (parser + carry for canRead,
// sink + writer state for canWrite).
//
// `Exit` is delivered through the same mailboxes to stop idle workers.

use crossbeam_channel::{bounded, Receiver, Sender};

pub enum Token<T> {
    Grant(T),
    Exit,
}

struct Mailbox<T> {
    tx: Sender<Token<T>>,
    rx: Receiver<Token<T>>,
}

impl<T> Mailbox<T> {
    fn new() -> Self {
        let (tx, rx) = bounded(1);
        Mailbox { tx, rx }
    }
}

pub struct TokenRing<R, W> {
    can_read: Vec<Mailbox<R>>,
    can_write: Vec<Mailbox<W>>,
}

impl<R: Send, W: Send> TokenRing<R, W> {
    pub fn new(slots: usize) -> Self {
        let slots = slots.max(1);
        TokenRing {
            can_read: (0..slots).map(|_| Mailbox::new()).collect(),
            can_write: (0..slots).map(|_| Mailbox::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.can_read.len()
    }

    pub fn is_empty(&self) -> bool {
        self.can_read.is_empty()
    }

    /// Slot after `slot`, wrapping.
    pub fn next(&self, slot: usize) -> usize {
        (slot + 1) % self.len()
    }

    pub fn grant_read(&self, slot: usize, token: R) {
        self.can_read[slot]
            .tx
            .send(Token::Grant(token))
            .unwrap_or_else(|_| unreachable!("canRead mailbox closed"));
    }

    pub fn grant_write(&self, slot: usize, token: W) {
        self.can_write[slot]
            .tx
            .send(Token::Grant(token))
            .unwrap_or_else(|_| unreachable!("canWrite mailbox closed"));
    }

    /// Blocks until `slot` receives canRead (or Exit).
    pub fn wait_read(&self, slot: usize) -> Token<R> {
        self.can_read[slot].rx.recv().unwrap_or(Token::Exit)
    }

    /// Blocks until `slot` receives canWrite (or Exit).
    pub fn wait_write(&self, slot: usize) -> Token<W> {
        self.can_write[slot].rx.recv().unwrap_or(Token::Exit)
    }

    /// Posts Exit to both mailboxes of `slot`.
    pub fn post_exit(&self, slot: usize) {
        // A full mailbox already holds something that will wake the slot.
        let _ = self.can_read[slot].tx.try_send(Token::Exit);
        let _ = self.can_write[slot].tx.try_send(Token::Exit);
    }
}
