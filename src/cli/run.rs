//! Operation dispatch: turns parsed arguments into encoder / engine calls.

use std::path::Path;

use anyhow::{Context, Result};

use crate::displaylevel;
use crate::engine::{decode_mt, DecodeStats, MtDecProps};
use crate::mtd::{encode_mt, MtdCodec};
use crate::util::format_size;

use super::args::{Cli, Command, CompressArgs, DecodeArgs, DecompressArgs, TestArgs};
use super::files::{
    compress_destination, decompress_destination, display_name, open_input, open_output,
    Destination,
};
use super::progress::DisplayProgress;

/// Runs the selected sub-command.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Compress(args) => compress(args),
        Command::Decompress(args) => decompress(args),
        Command::Test(args) => test(args),
    }
}

fn remove_partial(dst: &Destination) {
    if let Destination::File(p) = dst {
        if std::fs::remove_file(p).is_ok() {
            displaylevel!(3, "removed incomplete {}\n", p.display());
        }
    }
}

fn compress(args: &CompressArgs) -> Result<()> {
    let input_path = args.files.input.as_deref();
    let name = display_name(input_path);
    let dst = compress_destination(input_path, args.files.output.as_deref(), args.files.stdout);
    let props = args.props();

    let mut input = open_input(input_path).with_context(|| format!("{}: cannot open", name))?;
    let mut output = open_output(&dst, args.files.force).context("cannot open output")?;
    displaylevel!(
        4,
        "compress {}: block {} / {} worker(s) / {}\n",
        name,
        format_size(props.block_size as u64),
        props.nb_workers,
        props.method.name()
    );

    let stats = match encode_mt(&mut *input, &mut *output, &props) {
        Ok(s) => s,
        Err(e) => {
            drop(output);
            remove_partial(&dst);
            return Err(e).with_context(|| format!("{}: compression failed", name));
        }
    };
    let ratio = if stats.bytes_in == 0 { 0.0 } else { stats.bytes_out as f64 / stats.bytes_in as f64 * 100.0 };
    displaylevel!(
        2,
        "Compressed {} bytes into {} bytes ==> {:.2}% ({} block(s))\n",
        stats.bytes_in,
        stats.bytes_out,
        ratio,
        stats.blocks
    );
    Ok(())
}

/// Shared decode path for `decompress` and `test`.
fn decode_to(
    input_path: Option<&Path>,
    dst: &Destination,
    force: bool,
    decode: &DecodeArgs,
    props: &MtDecProps,
) -> Result<DecodeStats> {
    let name = display_name(input_path);
    let codec = if decode.no_check { MtdCodec::without_checksums() } else { MtdCodec::new() };

    let mut input = open_input(input_path).with_context(|| format!("{}: cannot open", name))?;
    let mut output = open_output(dst, force).context("cannot open output")?;
    displaylevel!(
        4,
        "decode {}: {} thread(s), in-buf {}, mem limit {}\n",
        name,
        props.num_threads_max,
        format_size(props.in_buf_size as u64),
        format_size(props.mem_use_max)
    );

    let mut progress = DisplayProgress::new(name.clone());
    let mut stats = DecodeStats::default();
    let res = decode_mt(&codec, &mut *input, &mut *output, props, Some(&mut progress), &mut stats);
    progress.clear();
    drop(output);
    if let Err(e) = res {
        remove_partial(dst);
        return Err(e).with_context(|| format!("{}: decoding failed", name));
    }
    if let Some(reason) = stats.fallback {
        displaylevel!(3, "{}: finished single-threaded ({})\n", name, reason);
    }
    Ok(stats)
}

fn report(stats: &DecodeStats) {
    displaylevel!(
        2,
        "Decoded {} bytes from {} bytes (mt: {})\n",
        stats.bytes_out,
        stats.bytes_in,
        if stats.multi_thread_used { "yes" } else { "no" }
    );
    if stats.truncated {
        displaylevel!(2, "output stopped at the size limit\n");
    }
    displaylevel!(
        3,
        "{} block(s), {} thread(s), peak block memory {}\n",
        stats.blocks,
        stats.threads_started.max(1),
        format_size(stats.peak_memory)
    );
}

fn decompress(args: &DecompressArgs) -> Result<()> {
    let input_path = args.files.input.as_deref();
    let dst = decompress_destination(input_path, args.files.output.as_deref(), args.files.stdout)?;
    let mut props = args.decode.props();
    props.out_size_limit = args.limit;
    let stats = decode_to(input_path, &dst, args.files.force, &args.decode, &props)?;
    report(&stats);
    Ok(())
}

fn test(args: &TestArgs) -> Result<()> {
    let input_path = args.input.as_deref();
    let props = args.decode.props();
    let stats = decode_to(input_path, &Destination::Discard, true, &args.decode, &props)?;
    report(&stats);
    displaylevel!(2, "{}: OK\n", display_name(input_path));
    Ok(())
}
