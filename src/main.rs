//! Binary entry point for the `mtdec` command-line tool.
//!
//! # Control flow
//!
//! 1. [`Cli::parse`] reads the command line (clap prints usage and exits on
//!    bad arguments).
//! 2. The notification level is set from `-v` / `-q`.
//! 3. [`run`] performs the operation; any error is printed at level 1 and
//!    the process exits with status 1.

use clap::Parser;

use mtdec::cli::{run, Cli};
use mtdec::display::set_display_level;

fn main() {
    let cli = Cli::parse();
    set_display_level(cli.display_level());
    mtdec::displaylevel!(
        4,
        "*** mtdec v{} {}-bit, {} core(s) ***\n",
        mtdec::version_string(),
        std::mem::size_of::<*const ()>() * 8,
        mtdec::util::count_cores()
    );

    if let Err(e) = run(&cli) {
        mtdec::displaylevel!(1, "mtdec: {:#}\n", e);
        std::process::exit(1);
    }
}
