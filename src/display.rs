// display.rs — Notification level and stderr display macros.
//
// One process-wide level gates every diagnostic the library and the CLI print:
//
//   0 = silent (library default), 1 = errors only, 2 = results + warnings,
//   3 = progress / fallback notices, 4 = verbose scheduling, 5 = per-block trace.
//
// The macros are `#[macro_export]`ed so both the library and `main.rs` use
// the same `displaylevel!` spelling.

use std::sync::atomic::{AtomicU32, Ordering};

/// Global notification level shared by all threads.
pub static DISPLAY_LEVEL: AtomicU32 = AtomicU32::new(0);

/// Returns the current display level.
#[inline]
pub fn display_level() -> u32 {
    DISPLAY_LEVEL.load(Ordering::Relaxed)
}

/// Sets the display level and returns the value stored.
#[inline]
pub fn set_display_level(level: u32) -> u32 {
    DISPLAY_LEVEL.store(level, Ordering::Relaxed);
    level
}

/// Print to stderr unconditionally.
#[macro_export]
macro_rules! display {
    ($($arg:tt)*) => { eprint!($($arg)*) };
}

/// Print to stderr when the display level is at least `level`.
#[macro_export]
macro_rules! displaylevel {
    ($level:expr, $($arg:tt)*) => {
        if $crate::display::display_level() >= $level {
            eprint!($($arg)*);
        }
    };
}

/// Per-block scheduling trace, compiled in only with the `trace` feature.
#[macro_export]
macro_rules! tracelevel {
    ($($arg:tt)*) => {
        #[cfg(feature = "trace")]
        {
            $crate::displaylevel!(5, $($arg)*);
        }
    };
}
