//! Command-line interface for the `mtdec` binary.
//!
//! | Submodule    | Responsibility |
//! |--------------|---------------|
//! | [`args`]     | clap grammar (`Cli`, sub-commands) and conversion to encoder / engine properties. |
//! | [`files`]    | stdin / stdout selection, output naming (`.mtd`), overwrite guard. |
//! | [`progress`] | Throttled progress line plugged into the engine's progress hook. |
//! | [`run`]      | Dispatch of `compress`, `decompress` and `test`; result reporting. |
//!
//! Typical call sequence: `Cli::parse` → `set_display_level` → [`run::run`].

pub mod args;
pub mod files;
pub mod progress;
pub mod run;

pub use args::Cli;
pub use run::run;
