//! Terminal progress line for long decodes.

use std::time::{Duration, Instant};

use crate::display::display_level;
use crate::displaylevel;
use crate::engine::Progress;

/// Minimum delay between two progress lines.
pub const REFRESH_RATE: Duration = Duration::from_millis(200);

/// Prints `Decoded : X MiB <- Y MiB` at display level 3, at most every
/// [`REFRESH_RATE`]. Never cancels.
pub struct DisplayProgress {
    name: String,
    last: Option<Instant>,
    shown: bool,
}

impl DisplayProgress {
    pub fn new(name: impl Into<String>) -> Self {
        DisplayProgress { name: name.into(), last: None, shown: false }
    }

    /// Erases the progress line if one was printed.
    pub fn clear(&mut self) {
        if self.shown {
            displaylevel!(3, "\r{:79}\r", "");
            self.shown = false;
        }
    }
}

impl Progress for DisplayProgress {
    fn progress(&mut self, in_size: u64, out_size: u64) -> bool {
        if display_level() < 3 {
            return true;
        }
        let now = Instant::now();
        if self.last.is_some_and(|t| now.duration_since(t) < REFRESH_RATE) {
            return true;
        }
        self.last = Some(now);
        self.shown = true;
        displaylevel!(
            3,
            "\r{:20} : Decoded {} MiB <- {} MiB   ",
            self.name,
            out_size >> 20,
            in_size >> 20
        );
        true
    }
}
