// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Thread-backed writer.

use super::{Producer, Shared, WriterBuilder, WriterParts};
use crate::config::WriterConfig;
use crate::error::{Result, WriterError};
use crate::flush_loop::FlushStats;
use crate::reader;
use std::path::Path;
use std::thread::{self, JoinHandle};

const FLUSH_THREAD_NAME: &str = "durable-logger-flush";

/// Batched, fsync'd log writer whose flush loop runs on its own thread.
///
/// ```no_run
/// use durable_logger::{EventWriter, WriterConfig};
///
/// let mut writer = EventWriter::open(WriterConfig::new("events.log"))?;
/// writer.append("Message: 0")?;
/// writer.stop()?;
/// # Ok::<(), durable_logger::WriterError>(())
/// ```
#[derive(Debug)]
pub struct EventWriter {
    shared: Shared,
    worker: Option<JoinHandle<FlushStats>>,
}

impl EventWriter {
    /// Start a writer with the default appender and observer.
    pub fn open(config: WriterConfig) -> Result<Self> {
        WriterBuilder::new(config).spawn()
    }

    pub fn builder(config: WriterConfig) -> WriterBuilder {
        WriterBuilder::new(config)
    }

    pub(super) fn start(parts: WriterParts) -> Result<Self> {
        let WriterParts { shared, flush_loop } = parts;
        let worker = thread::Builder::new()
            .name(FLUSH_THREAD_NAME.into())
            .spawn(move || flush_loop.run_blocking())?;

        tracing::info!("Event writer started for {:?}", shared.path);
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Enqueue a message stamped with the current time.
    pub fn append(&self, message: impl Into<String>) -> Result<()> {
        self.shared.producer().append(message)
    }

    /// A cloneable handle for producer threads.
    pub fn producer(&self) -> Producer {
        self.shared.producer()
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Read the log file from the start. Debugging aid, not synchronized
    /// with in-flight batches.
    pub fn read_all(&self) -> Result<Vec<String>> {
        reader::read_all(&self.shared.path)
    }

    /// Request shutdown and block until every accepted record has been
    /// written and synced.
    ///
    /// There is no timeout: if the sink keeps failing this never returns.
    pub fn stop(&mut self) -> Result<FlushStats> {
        let worker = self.worker.take().ok_or(WriterError::UseAfterStop)?;
        self.shared.request_shutdown();
        worker.join().map_err(|_| WriterError::FlushLoopPanicked)
    }

    /// Consuming form of [`EventWriter::stop`].
    pub fn close(mut self) -> Result<FlushStats> {
        self.stop()
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                tracing::error!("Event writer for {:?} failed to stop: {}", self.shared.path, e);
            }
        }
    }
}
