// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Batch Assembler
//!
//! Micro-batching admission policy: a batch is released as soon as
//! `batch_size` records are available OR `flush_interval` has elapsed since
//! assembly began, whichever comes first. Waiting is a genuine suspension on
//! the queue, never a poll loop. A sealed queue releases the wait early.

use crate::queue::EventQueue;
use crate::record::Record;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BatchAssembler {
    batch_size: usize,
    flush_interval: Duration,
}

impl BatchAssembler {
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            batch_size,
            flush_interval,
        }
    }

    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Thread backend: block until the size or time trigger fires.
    ///
    /// An empty result means nothing arrived within the interval.
    pub fn collect_blocking(&self, queue: &EventQueue) -> Vec<Record> {
        queue.wait_for(self.batch_size, self.flush_interval);
        self.collect_now(queue)
    }

    /// Task backend: suspend until the size or time trigger fires.
    pub async fn collect(&self, queue: &EventQueue) -> Vec<Record> {
        queue.wait_for_async(self.batch_size, self.flush_interval).await;
        self.collect_now(queue)
    }

    /// Take whatever is queued, up to `batch_size`, without waiting.
    pub fn collect_now(&self, queue: &EventQueue) -> Vec<Record> {
        queue.try_pop_batch(self.batch_size)
    }
}
