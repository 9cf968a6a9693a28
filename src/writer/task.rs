// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Task-backed writer for tokio applications.

use super::{Producer, Shared, WriterBuilder, WriterParts};
use crate::config::WriterConfig;
use crate::error::{Result, WriterError};
use crate::flush_loop::FlushStats;
use crate::reader;
use std::path::Path;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Same contract as [`super::EventWriter`], but the flush loop is a task on
/// the current tokio runtime and waiting never blocks a worker thread.
///
/// Dropping the writer without [`AsyncEventWriter::stop`] only requests the
/// stop; the task keeps draining in the background as long as the runtime
/// lives.
#[derive(Debug)]
pub struct AsyncEventWriter {
    shared: Shared,
    task: Option<JoinHandle<FlushStats>>,
}

impl AsyncEventWriter {
    /// Start a writer with the default appender and observer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: WriterConfig) -> Result<Self> {
        WriterBuilder::new(config).spawn_async()
    }

    pub fn builder(config: WriterConfig) -> WriterBuilder {
        WriterBuilder::new(config)
    }

    pub(super) fn start(parts: WriterParts) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| WriterError::NoRuntime)?;
        let WriterParts { shared, flush_loop } = parts;
        let task = runtime.spawn(flush_loop.run());

        tracing::info!("Async event writer started for {:?}", shared.path);
        Ok(Self {
            shared,
            task: Some(task),
        })
    }

    /// Enqueue a message stamped with the current time. The push is a short
    /// critical section, so there is nothing to await.
    pub fn append(&self, message: impl Into<String>) -> Result<()> {
        self.shared.producer().append(message)
    }

    /// A cloneable handle for producer tasks.
    pub fn producer(&self) -> Producer {
        self.shared.producer()
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    pub async fn read_all(&self) -> Result<Vec<String>> {
        reader::read_all_async(&self.shared.path).await
    }

    /// Request shutdown and wait until every accepted record has been
    /// written and synced. No timeout; see [`crate::flush_loop`].
    pub async fn stop(&mut self) -> Result<FlushStats> {
        let task = self.task.take().ok_or(WriterError::UseAfterStop)?;
        self.shared.request_shutdown();
        task.await.map_err(|e| {
            if e.is_panic() {
                WriterError::FlushLoopPanicked
            } else {
                WriterError::FlushLoopCancelled
            }
        })
    }

    /// Consuming form of [`AsyncEventWriter::stop`].
    pub async fn close(mut self) -> Result<FlushStats> {
        self.stop().await
    }
}

impl Drop for AsyncEventWriter {
    fn drop(&mut self) {
        if self.task.take().is_some() {
            tracing::debug!("Async event writer dropped without stop, draining in background");
            self.shared.request_shutdown();
        }
    }
}
