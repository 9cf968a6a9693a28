// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

use durable_logger::reader;
use durable_logger::{AppendError, BatchSink, DurableAppender, FlushObserver, Record};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Message part of every line in the log.
pub fn messages(path: &Path) -> Vec<String> {
    reader::read_records(path)
        .unwrap()
        .into_iter()
        .map(|r| r.message().to_string())
        .collect()
}

/// Real appender that remembers the messages of every successful write.
#[derive(Clone)]
pub struct RecordingSink {
    inner: Arc<Mutex<DurableAppender>>,
    pub batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl RecordingSink {
    pub fn new(path: &Path) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DurableAppender::new(path))),
            batches: Arc::default(),
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

impl BatchSink for RecordingSink {
    fn append_batch(&mut self, batch: &[Record]) -> Result<(), AppendError> {
        self.inner.lock().unwrap().append_batch(batch)?;
        if !batch.is_empty() {
            self.batches
                .lock()
                .unwrap()
                .push(batch.iter().map(|r| r.message().to_string()).collect());
        }
        Ok(())
    }
}

/// Fails the first `failures` appends with a sync error, then delegates.
pub struct FlakySink {
    inner: DurableAppender,
    failures: Arc<AtomicUsize>,
}

impl FlakySink {
    pub fn new(path: &Path, failures: usize) -> Self {
        Self {
            inner: DurableAppender::new(path),
            failures: Arc::new(AtomicUsize::new(failures)),
        }
    }

    /// Shared counter of failures still to inject.
    pub fn remaining(&self) -> Arc<AtomicUsize> {
        self.failures.clone()
    }
}

impl BatchSink for FlakySink {
    fn append_batch(&mut self, batch: &[Record]) -> Result<(), AppendError> {
        let injected = self
            .failures
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AppendError::Sync {
                path: self.inner.path().to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "injected sync failure"),
            });
        }
        self.inner.append_batch(batch)
    }
}

/// Counts observer callbacks.
#[derive(Clone, Default)]
pub struct CountingObserver {
    pub flushes: Arc<AtomicUsize>,
    pub errors: Arc<AtomicUsize>,
}

impl FlushObserver for CountingObserver {
    fn on_flush(&self, _records: usize, _elapsed: Duration) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, _error: &AppendError, _records: usize) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}
