// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Durable Batch Appender
//!
//! This is the durability layer of the writer.
//! - One batch = one write of newline-joined lines
//! - Buffer flush, then fsync, before returning Ok
//! - Append-only: committed bytes are never rewritten
//!
//! A failed write, flush or sync rolls the file back to the length it had
//! after the last successful sync and drops the handle. The next attempt
//! reopens the file and cuts off anything past that length again, so a
//! retried batch lands exactly once.

use crate::record::{encode_batch, Record};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppendError {
    #[error("Failed to open {path:?}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to write batch to {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to flush {path:?}: {source}")]
    Flush { path: PathBuf, source: io::Error },

    #[error("Failed to sync {path:?}: {source}")]
    Sync { path: PathBuf, source: io::Error },
}

impl AppendError {
    pub fn path(&self) -> &Path {
        match self {
            AppendError::Open { path, .. }
            | AppendError::Write { path, .. }
            | AppendError::Flush { path, .. }
            | AppendError::Sync { path, .. } => path,
        }
    }
}

/// Destination for assembled batches.
///
/// The flush loop owns its sink exclusively and calls it from one thread at
/// a time. An implementation must either persist the whole batch and return
/// `Ok`, or return `Err` and leave no trace of it, because the loop retries
/// the same batch later.
pub trait BatchSink: Send + 'static {
    fn append_batch(&mut self, batch: &[Record]) -> Result<(), AppendError>;
}

impl<S: BatchSink + ?Sized> BatchSink for Box<S> {
    fn append_batch(&mut self, batch: &[Record]) -> Result<(), AppendError> {
        (**self).append_batch(batch)
    }
}

/// Append-only text log with fsync per batch.
#[derive(Debug)]
pub struct DurableAppender {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    /// File length after the last successful sync. Read from disk on the
    /// first open only.
    synced_len: Option<u64>,
    batches_written: u64,
    #[cfg(test)]
    fail_next_sync: bool,
    #[cfg(test)]
    fail_next_roll_back: bool,
}

impl DurableAppender {
    /// Create an appender for `path`. The file is not touched until the
    /// first non-empty batch.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
            synced_len: None,
            batches_written: 0,
            #[cfg(test)]
            fail_next_sync: false,
            #[cfg(test)]
            fail_next_roll_back: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of batches durably written by this appender.
    pub fn batches_written(&self) -> u64 {
        self.batches_written
    }

    fn open(&mut self) -> Result<&mut BufWriter<File>, AppendError> {
        let writer = match self.file.take() {
            Some(writer) => writer,
            None => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.path)
                    .map_err(|source| AppendError::Open {
                        path: self.path.clone(),
                        source,
                    })?;
                let len = file
                    .metadata()
                    .map_err(|source| AppendError::Open {
                        path: self.path.clone(),
                        source,
                    })?
                    .len();
                let known = self.synced_len;
                match known {
                    // Tail of a failed batch whose roll back did not stick
                    Some(synced) if len > synced => {
                        file.set_len(synced).map_err(|source| AppendError::Open {
                            path: self.path.clone(),
                            source,
                        })?;
                    }
                    Some(synced) if len == synced => {}
                    _ => self.synced_len = Some(len),
                }
                BufWriter::new(file)
            }
        };
        Ok(self.file.insert(writer))
    }

    fn write_synced(&mut self, bytes: &[u8]) -> Result<(), AppendError> {
        let path = self.path.clone();
        let file = self.open()?;

        file.write_all(bytes)
            .map_err(|source| AppendError::Write { path: path.clone(), source })?;

        // Flush buffer to OS
        file.flush()
            .map_err(|source| AppendError::Flush { path: path.clone(), source })?;

        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(AppendError::Sync {
                path,
                source: io::Error::new(io::ErrorKind::Other, "injected sync failure"),
            });
        }

        // Force fsync, only now is the batch durable
        let file = self.open()?;
        file.get_ref()
            .sync_all()
            .map_err(|source| AppendError::Sync { path, source })?;

        Ok(())
    }

    /// Drop the handle and cut off whatever the failed batch left behind.
    fn roll_back(&mut self) {
        let (Some(writer), Some(synced_len)) = (self.file.take(), self.synced_len) else {
            return;
        };
        // Unflushed bytes are discarded with the buffer
        let (file, _unflushed) = writer.into_parts();

        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_roll_back) {
            return;
        }

        let result = file.set_len(synced_len).and_then(|_| file.sync_all());
        if let Err(e) = result {
            tracing::warn!(
                "Could not truncate {:?} back to {} bytes after failed append: {}",
                self.path,
                synced_len,
                e
            );
        }
    }
}

impl BatchSink for DurableAppender {
    /// Write, flush and fsync one batch.
    ///
    /// Only returns `Ok` after the batch is durable. An empty batch is a
    /// no-op that does not even create the file.
    fn append_batch(&mut self, batch: &[Record]) -> Result<(), AppendError> {
        if batch.is_empty() {
            return Ok(());
        }

        let encoded = encode_batch(batch);
        match self.write_synced(encoded.as_bytes()) {
            Ok(()) => {
                self.synced_len = self.synced_len.map(|len| len + encoded.len() as u64);
                self.batches_written += 1;
                Ok(())
            }
            Err(e) => {
                self.roll_back();
                Err(e)
            }
        }
    }
}
