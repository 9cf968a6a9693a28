// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! durable-logger: a batched, fsync'd, append-only event log writer.
//!
//! # Architecture
//! - EventQueue = unbounded FIFO shared with producers
//! - BatchAssembler = size-or-timeout micro-batching
//! - DurableAppender = one write + flush + fsync per batch
//! - FlushLoop = RUNNING → DRAINING state machine on a thread or a task
//!
//! # Guarantees
//! - File order is queue arrival order
//! - A graceful stop writes every accepted record before returning
//! - A failed append is retried, never dropped or duplicated

pub mod appender;
pub mod assembler;
pub mod config;
pub mod error;
pub mod flush_loop;
pub mod observer;
pub mod queue;
pub mod reader;
pub mod record;
pub mod telemetry;
pub mod writer;

pub use appender::{AppendError, BatchSink, DurableAppender};
pub use config::WriterConfig;
pub use error::{Result, WriterError};
pub use flush_loop::FlushStats;
pub use observer::{FlushObserver, TracingObserver};
pub use record::Record;
pub use writer::{AsyncEventWriter, EventWriter, Producer, WriterBuilder};
