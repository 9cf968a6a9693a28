// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Writer handles.
//!
//! Two handles expose the same contract over different schedulers:
//! - [`EventWriter`]: flush loop on a dedicated OS thread
//! - [`AsyncEventWriter`]: flush loop as a tokio task
//!
//! Producers only ever touch the queue, through [`Producer`]. The flush loop
//! learns about shutdown from [`WriterState`].

pub mod task;
pub mod threaded;

pub use task::AsyncEventWriter;
pub use threaded::EventWriter;

use crate::appender::{BatchSink, DurableAppender};
use crate::assembler::BatchAssembler;
use crate::config::WriterConfig;
use crate::error::{Result, WriterError};
use crate::flush_loop::FlushLoop;
use crate::observer::{FlushObserver, TracingObserver};
use crate::queue::EventQueue;
use crate::record::Record;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// `running` flips from true to false exactly once.
#[derive(Debug)]
pub struct WriterState {
    running: AtomicBool,
}

impl WriterState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Returns `true` for the call that performed the transition.
    pub fn request_stop(&self) -> bool {
        self.running
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for WriterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable submission handle for producer threads or tasks.
#[derive(Debug, Clone)]
pub struct Producer {
    queue: Arc<EventQueue>,
}

impl Producer {
    /// Stamp `message` with the current time and enqueue it. Never blocks on
    /// I/O. Fails only after the writer has been stopped.
    ///
    /// Messages should be single-line; see [`Record::now`].
    pub fn append(&self, message: impl Into<String>) -> Result<()> {
        self.queue
            .push(Record::now(message))
            .map_err(|_| WriterError::UseAfterStop)
    }
}

/// Builder shared by both handles.
pub struct WriterBuilder {
    config: WriterConfig,
    sink: Option<Box<dyn BatchSink>>,
    observer: Arc<dyn FlushObserver>,
}

impl WriterBuilder {
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            sink: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the default [`DurableAppender`] on `file_path`.
    pub fn sink(mut self, sink: impl BatchSink) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn observer(mut self, observer: impl FlushObserver) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Start the flush loop on a dedicated thread.
    pub fn spawn(self) -> Result<EventWriter> {
        EventWriter::start(self.into_parts()?)
    }

    /// Start the flush loop as a task on the current tokio runtime.
    pub fn spawn_async(self) -> Result<AsyncEventWriter> {
        AsyncEventWriter::start(self.into_parts()?)
    }

    fn into_parts(self) -> Result<WriterParts> {
        self.config.validate()?;

        let queue = Arc::new(EventQueue::new());
        let state = Arc::new(WriterState::new());
        let sink: Box<dyn BatchSink> = match self.sink {
            Some(sink) => sink,
            None => Box::new(DurableAppender::new(&self.config.file_path)),
        };
        let flush_loop = FlushLoop::new(
            queue.clone(),
            state.clone(),
            BatchAssembler::new(self.config.batch_size, self.config.flush_interval),
            sink,
            self.observer,
        );

        Ok(WriterParts {
            shared: Shared {
                queue,
                state,
                path: self.config.file_path,
            },
            flush_loop,
        })
    }
}

struct WriterParts {
    shared: Shared,
    flush_loop: FlushLoop<Box<dyn BatchSink>>,
}

/// State both handles hold on the producer side of the loop.
#[derive(Debug)]
struct Shared {
    queue: Arc<EventQueue>,
    state: Arc<WriterState>,
    path: PathBuf,
}

impl Shared {
    fn producer(&self) -> Producer {
        Producer {
            queue: self.queue.clone(),
        }
    }

    /// Seal the queue first, then flip the flag: once the loop sees the flag,
    /// every accepted record is already queued.
    fn request_shutdown(&self) {
        self.queue.close();
        if self.state.request_stop() {
            tracing::info!(
                "Stopping writer for {:?}, {} records pending",
                self.path,
                self.queue.len()
            );
        }
    }
}
