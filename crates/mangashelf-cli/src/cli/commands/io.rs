//! Input and report streams: a file when a path is given, stdin/stdout otherwise.

use anyhow::{Context, Result};
use mangashelf_core::report;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Read single-column titles from `path`, or stdin.
pub fn read_records(path: Option<&Path>) -> Result<Vec<String>> {
    match path {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("open input {}", p.display()))?;
            report::read_single_column(BufReader::new(file))
        }
        None => report::read_single_column(io::stdin().lock()),
    }
}

/// Open the report destination: `path` (created or truncated), or stdout.
pub fn open_report(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(p) => {
            let file = File::create(p).with_context(|| format!("create report {}", p.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}
