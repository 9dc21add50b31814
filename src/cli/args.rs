//! Command-line grammar for the `mtdec` binary.
//!
//! ```text
//! mtdec [-v|-q]... compress   [-T N] [-B SIZE] [--method rle|stored] [--no-check] [-c|-o OUT] [-f] [INPUT]
//! mtdec [-v|-q]... decompress [-T N] [--in-buf SIZE] [--mem-limit SIZE] [--limit SIZE] [--no-check] [-c|-o OUT] [-f] [INPUT]
//! mtdec [-v|-q]... test       [-T N] [--in-buf SIZE] [--mem-limit SIZE] [--no-check] [INPUT]
//! ```
//!
//! Sizes accept the `K`, `M` and `G` suffixes (binary multiples). An input of
//! `-`, or none at all, reads stdin.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::NB_THREADS_DEFAULT;
use crate::engine::MtDecProps;
use crate::mtd::{EncodeProps, Method};
use crate::util::{default_nb_threads, parse_size};

/// Default notification level of the binary (results and warnings).
pub const DISPLAY_LEVEL_DEFAULT: u32 = 2;

#[derive(Debug, Parser)]
#[command(name = "mtdec", version, about = "Multithreaded MTD block-stream compressor and decoder")]
pub struct Cli {
    /// Increase verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Decrease verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Display level after applying `-v` / `-q`.
    pub fn display_level(&self) -> u32 {
        (DISPLAY_LEVEL_DEFAULT + self.verbose as u32).saturating_sub(self.quiet as u32)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Encode INPUT into an MTD frame.
    Compress(CompressArgs),
    /// Decode an MTD stream.
    Decompress(DecompressArgs),
    /// Decode an MTD stream and discard the output.
    Test(TestArgs),
}

/// Payload coding of encoded blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodArg {
    Stored,
    Rle,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Method {
        match m {
            MethodArg::Stored => Method::Stored,
            MethodArg::Rle => Method::Rle,
        }
    }
}

/// Input / output selection shared by `compress` and `decompress`.
#[derive(Debug, Clone, Args)]
pub struct FileArgs {
    /// Input file; `-` or absent reads stdin.
    pub input: Option<PathBuf>,

    /// Output file; derived from INPUT when omitted.
    #[arg(short, long, conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write to stdout.
    #[arg(short = 'c', long)]
    pub stdout: bool,

    /// Overwrite an existing output file.
    #[arg(short, long)]
    pub force: bool,
}

/// Engine tuning shared by `decompress` and `test`.
#[derive(Debug, Clone, Args)]
pub struct DecodeArgs {
    /// Worker threads (0 = one per core). Defaults to $MTDEC_NBTHREADS or the core count.
    #[arg(short = 'T', long)]
    pub threads: Option<usize>,

    /// Input chunk size.
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub in_buf: Option<u64>,

    /// Memory ceiling for in-flight blocks.
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub mem_limit: Option<u64>,

    /// Skip block and content checksum verification.
    #[arg(long)]
    pub no_check: bool,
}

impl DecodeArgs {
    /// Engine properties for these flags.
    pub fn props(&self) -> MtDecProps {
        let mut props = MtDecProps::default();
        props.set_num_threads(resolve_threads(self.threads));
        if let Some(size) = self.in_buf {
            props.set_in_buf_size(usize::try_from(size).unwrap_or(usize::MAX));
        }
        if let Some(limit) = self.mem_limit {
            props.mem_use_max = limit;
        }
        props
    }
}

#[derive(Debug, Clone, Args)]
pub struct CompressArgs {
    #[command(flatten)]
    pub files: FileArgs,

    /// Worker threads (0 = one per core).
    #[arg(short = 'T', long)]
    pub threads: Option<usize>,

    /// Uncompressed bytes per block.
    #[arg(short = 'B', long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub block_size: Option<u64>,

    #[arg(long, value_enum, default_value_t = MethodArg::Rle)]
    pub method: MethodArg,

    /// Do not append the content checksum.
    #[arg(long)]
    pub no_check: bool,
}

impl CompressArgs {
    pub fn props(&self) -> EncodeProps {
        let mut props = EncodeProps {
            nb_workers: resolve_threads(self.threads),
            method: self.method.into(),
            content_checksum: !self.no_check,
            ..EncodeProps::default()
        };
        if let Some(size) = self.block_size {
            props.block_size = usize::try_from(size).unwrap_or(usize::MAX);
        }
        props
    }
}

#[derive(Debug, Clone, Args)]
pub struct DecompressArgs {
    #[command(flatten)]
    pub files: FileArgs,

    #[command(flatten)]
    pub decode: DecodeArgs,

    /// Stop after writing this many decoded bytes.
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct TestArgs {
    /// Input file; `-` or absent reads stdin.
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub decode: DecodeArgs,
}

fn parse_size_arg(s: &str) -> Result<u64, String> {
    parse_size(s)
}

/// `None` → environment / core count; `Some(0)` → core count.
fn resolve_threads(requested: Option<usize>) -> usize {
    match requested {
        None => default_nb_threads(),
        Some(NB_THREADS_DEFAULT) => crate::util::count_cores(),
        Some(n) => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IN_BUF_SIZE_MIN, NB_THREADS_MAX};
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("mtdec").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn grammar_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_moves_display_level() {
        assert_eq!(parse(&["test"]).display_level(), 2);
        assert_eq!(parse(&["-vv", "test"]).display_level(), 4);
        assert_eq!(parse(&["test", "-qqq"]).display_level(), 0);
    }

    #[test]
    fn decompress_flags_reach_props() {
        let cli = parse(&[
            "decompress", "-T", "3", "--in-buf", "64K", "--mem-limit", "8M", "--limit", "1K", "in.mtd",
        ]);
        let Command::Decompress(args) = cli.command else { panic!("wrong subcommand") };
        let props = args.decode.props();
        assert_eq!(props.num_threads_max, 3);
        assert_eq!(props.in_buf_size, 64 * 1024);
        assert_eq!(props.mem_use_max, 8 << 20);
        assert_eq!(args.limit, Some(1024));
        assert_eq!(args.files.input, Some(PathBuf::from("in.mtd")));
    }

    #[test]
    fn props_are_clamped() {
        let cli = parse(&["test", "-T", "1000", "--in-buf", "1"]);
        let Command::Test(args) = cli.command else { panic!("wrong subcommand") };
        let props = args.decode.props();
        assert_eq!(props.num_threads_max, NB_THREADS_MAX);
        assert_eq!(props.in_buf_size, IN_BUF_SIZE_MIN);
    }

    #[test]
    fn compress_method_and_checksum() {
        let cli = parse(&["compress", "--method", "stored", "--no-check", "-B", "4K", "-c"]);
        let Command::Compress(args) = cli.command else { panic!("wrong subcommand") };
        let props = args.props();
        assert_eq!(props.method, Method::Stored);
        assert!(!props.content_checksum);
        assert_eq!(props.block_size, 4096);
        assert!(args.files.stdout);
    }

    #[test]
    fn bad_size_is_rejected() {
        let r = Cli::try_parse_from(["mtdec", "test", "--in-buf", "12Q"]);
        assert!(r.is_err());
    }

    #[test]
    fn stdout_conflicts_with_output() {
        let r = Cli::try_parse_from(["mtdec", "decompress", "-c", "-o", "x", "in.mtd"]);
        assert!(r.is_err());
    }
}
