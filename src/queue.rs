// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event Queue
//!
//! Unbounded FIFO shared between producers and the flush loop.
//!
//! # Concurrency Contract
//! - Many producers may `push` concurrently; order is arrival at the lock.
//! - Exactly one consumer pops (the flush loop).
//! - `push` never blocks on I/O and never fails while the queue is open.
//! - `close` seals the queue under the same lock, so every accepted push
//!   happens-before the seal and is seen by the final drain.
//!
//! Waiting is provided for both scheduling backends: a `Condvar` for the
//! thread backend and a `Notify` for the task backend. Both are signalled on
//! every push and on close.

use crate::record::Record;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Returned by [`EventQueue::push`] once the queue has been sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueClosed(pub Record);

#[derive(Debug, Default)]
struct Inner {
    records: VecDeque<Record>,
    closed: bool,
}

impl Inner {
    fn ready(&self, min_len: usize) -> bool {
        self.closed || self.records.len() >= min_len
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    inner: Mutex<Inner>,
    available: Condvar,
    notify: Notify,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A producer panicking mid-push cannot leave the deque half-updated
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn signal(&self) {
        self.available.notify_all();
        self.notify.notify_one();
    }

    /// Append a record at the tail.
    pub fn push(&self, record: Record) -> Result<(), QueueClosed> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(QueueClosed(record));
            }
            inner.records.push_back(record);
        }
        self.signal();
        Ok(())
    }

    /// Pop up to `max` records from the head without waiting.
    pub fn try_pop_batch(&self, max: usize) -> Vec<Record> {
        let mut inner = self.lock();
        let take = max.min(inner.records.len());
        inner.records.drain(..take).collect()
    }

    /// Seal the queue. Returns `false` if it was already sealed.
    pub fn close(&self) -> bool {
        let newly_closed = {
            let mut inner = self.lock();
            !std::mem::replace(&mut inner.closed, true)
        };
        self.signal();
        newly_closed
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Block the calling thread until at least `min_len` records are queued,
    /// the queue is sealed, or `timeout` elapses. A timeout too large to
    /// represent as a deadline waits without one.
    pub fn wait_for(&self, min_len: usize, timeout: Duration) {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.lock();
        while !inner.ready(min_len) {
            inner = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return;
                    }
                    self.available
                        .wait_timeout(inner, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
                None => self
                    .available
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    /// Suspend the current task until at least `min_len` records are queued,
    /// the queue is sealed, or `timeout` elapses.
    pub async fn wait_for_async(&self, min_len: usize, timeout: Duration) {
        let deadline = tokio::time::Instant::now().checked_add(timeout);
        loop {
            // Register interest before checking, a push in between leaves a permit
            let notified = self.notify.notified();
            let ready = self.lock().ready(min_len);
            if ready {
                return;
            }
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return;
                    }
                }
                None => notified.await,
            }
        }
    }
}
