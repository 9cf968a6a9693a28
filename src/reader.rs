// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Log Reader
//!
//! Reads the text log back for verification and debugging. Not part of the
//! durability path and not synchronized with a running writer: a batch that
//! is mid-write may or may not be visible.

use crate::error::Result;
use crate::record::Record;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// All lines of the log, in file order. A missing file reads as empty.
pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let lines = BufReader::new(file).lines().collect::<io::Result<Vec<_>>>()?;
    Ok(lines)
}

/// [`read_all`] without blocking the runtime.
pub async fn read_all_async(path: impl AsRef<Path>) -> Result<Vec<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents.lines().map(str::to_owned).collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Parse every line back into a [`Record`].
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>> {
    read_all(path)?
        .iter()
        .map(|line| Record::parse_line(line).map_err(Into::into))
        .collect()
}
