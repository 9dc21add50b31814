//! Source / destination resolution for the CLI.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::displaylevel;

/// Name that selects stdin / stdout.
pub const STDIO_MARK: &str = "-";
/// Extension appended by `compress` and stripped by `decompress`.
pub const MTD_EXTENSION: &str = ".mtd";

/// Where the output of an operation goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    File(PathBuf),
    Discard,
}

fn is_stdio(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p.as_os_str() == STDIO_MARK)
}

/// Opens the input, stdin when `path` is absent or `-`.
pub fn open_input(path: Option<&Path>) -> io::Result<Box<dyn Read + Send>> {
    match path {
        Some(p) if !is_stdio(path) => {
            if p.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{}: is a directory", p.display()),
                ));
            }
            let f = File::open(p)?;
            Ok(Box::new(BufReader::new(f)))
        }
        _ => {
            displaylevel!(4, "Using stdin for input\n");
            Ok(Box::new(io::stdin()))
        }
    }
}

/// Opens the output. Refuses to replace an existing file unless `force`.
pub fn open_output(dst: &Destination, force: bool) -> io::Result<Box<dyn Write + Send>> {
    match dst {
        Destination::Stdout => {
            displaylevel!(4, "Using stdout for output\n");
            Ok(Box::new(io::stdout()))
        }
        Destination::Discard => Ok(Box::new(io::sink())),
        Destination::File(p) => {
            let mut opts = OpenOptions::new();
            opts.write(true);
            if force {
                opts.create(true).truncate(true);
            } else {
                opts.create_new(true);
            }
            let f = opts.open(p).map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    io::Error::new(
                        e.kind(),
                        format!("{} already exists; not overwritten (use -f)", p.display()),
                    )
                } else {
                    e
                }
            })?;
            Ok(Box::new(BufWriter::new(f)))
        }
    }
}

/// Output for `compress`: explicit `-o`, stdout for `-c` or stdin input,
/// otherwise `INPUT.mtd`.
pub fn compress_destination(input: Option<&Path>, output: Option<&Path>, stdout: bool) -> Destination {
    if let Some(o) = output {
        return Destination::File(o.to_path_buf());
    }
    match input {
        Some(p) if !stdout && !is_stdio(input) => {
            let mut name = p.as_os_str().to_owned();
            name.push(MTD_EXTENSION);
            Destination::File(PathBuf::from(name))
        }
        _ => Destination::Stdout,
    }
}

/// Output for `decompress`: explicit `-o`, stdout for `-c` or stdin input,
/// otherwise INPUT without its `.mtd` extension.
pub fn decompress_destination(
    input: Option<&Path>,
    output: Option<&Path>,
    stdout: bool,
) -> io::Result<Destination> {
    if let Some(o) = output {
        return Ok(Destination::File(o.to_path_buf()));
    }
    match input {
        Some(p) if !stdout && !is_stdio(input) => {
            let name = p.to_string_lossy();
            match name.strip_suffix(MTD_EXTENSION) {
                Some(stem) if !stem.is_empty() => Ok(Destination::File(PathBuf::from(stem))),
                _ => Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{}: unknown suffix ({} expected); use -o or -c", name, MTD_EXTENSION),
                )),
            }
        }
        _ => Ok(Destination::Stdout),
    }
}

/// Label used in messages.
pub fn display_name(path: Option<&Path>) -> String {
    if is_stdio(path) {
        "stdin".to_string()
    } else {
        path.map(|p| p.display().to_string()).unwrap_or_default()
    }
}
