// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Flush Loop
//!
//! Background driver: BatchAssembler → BatchSink, over and over.
//!
//! # States
//! ```text
//! RUNNING ──(stop requested, checked after each cycle)──▶ DRAINING ──(queue empty)──▶ exit
//! ```
//!
//! - RUNNING waits on the size-or-timeout trigger.
//! - DRAINING pops without waiting until the queue is empty.
//!
//! # Failure Handling
//! A failed append is reported to the observer and the batch is kept. It is
//! retried, after one `flush_interval` of backoff, before anything newer is
//! assembled, so records are never dropped or reordered. If the sink never
//! recovers the loop never finishes, and neither does `stop`.
//!
//! The same state machine runs on a dedicated thread (`run_blocking`) or as
//! a tokio task (`run`).

use crate::appender::{AppendError, BatchSink};
use crate::assembler::BatchAssembler;
use crate::observer::FlushObserver;
use crate::queue::EventQueue;
use crate::record::Record;
use crate::writer::WriterState;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Running,
    Draining,
}

/// Counters reported when the loop terminates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub batches_written: u64,
    pub records_written: u64,
    pub failed_attempts: u64,
}

/// Everything except the sink, so the async runner can lend the sink to a
/// blocking task while keeping the rest.
struct LoopCore {
    queue: Arc<EventQueue>,
    state: Arc<WriterState>,
    assembler: BatchAssembler,
    observer: Arc<dyn FlushObserver>,
    phase: LoopPhase,
    /// Batch whose last append failed.
    pending: Option<Vec<Record>>,
    stats: FlushStats,
}

pub struct FlushLoop<S> {
    core: LoopCore,
    sink: S,
}

impl<S: BatchSink> FlushLoop<S> {
    pub fn new(
        queue: Arc<EventQueue>,
        state: Arc<WriterState>,
        assembler: BatchAssembler,
        sink: S,
        observer: Arc<dyn FlushObserver>,
    ) -> Self {
        Self {
            core: LoopCore {
                queue,
                state,
                assembler,
                observer,
                phase: LoopPhase::Running,
                pending: None,
                stats: FlushStats::default(),
            },
            sink,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.core.phase
    }

    /// Thread backend. Returns once stop was requested and the queue drained.
    pub fn run_blocking(mut self) -> FlushStats {
        tracing::debug!("Flush loop started on thread {:?}", std::thread::current().name());
        while let Some(batch) = self.core.next_batch_blocking() {
            let started = Instant::now();
            let result = self.sink.append_batch(&batch);
            self.core.complete(batch, result, started.elapsed());
        }
        self.core.finish()
    }

    /// Task backend. The write + fsync runs on tokio's blocking pool so the
    /// scheduler is never stalled by disk I/O.
    pub async fn run(self) -> FlushStats {
        let FlushLoop { mut core, mut sink } = self;
        tracing::debug!("Flush loop started as task");

        while let Some(batch) = core.next_batch().await {
            let started = Instant::now();
            let joined = tokio::task::spawn_blocking(move || {
                let result = sink.append_batch(&batch);
                (sink, batch, result)
            })
            .await;

            let (returned, batch, result) = match joined {
                Ok(parts) => parts,
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => {
                    // Runtime is shutting down underneath us
                    tracing::error!("Append task cancelled, abandoning drain: {}", e);
                    return core.finish();
                }
            };
            sink = returned;
            core.complete(batch, result, started.elapsed());
        }
        core.finish()
    }
}

impl LoopCore {
    fn retry_delay(&self) -> Duration {
        self.assembler.flush_interval()
    }

    fn next_batch_blocking(&mut self) -> Option<Vec<Record>> {
        loop {
            if let Some(batch) = self.pending.take() {
                match self.phase {
                    // Woken early by stop
                    LoopPhase::Running => self.queue.wait_for(usize::MAX, self.retry_delay()),
                    LoopPhase::Draining => std::thread::sleep(self.retry_delay()),
                }
                return Some(batch);
            }

            match self.phase {
                LoopPhase::Running => {
                    let batch = self.assembler.collect_blocking(&self.queue);
                    if !batch.is_empty() {
                        return Some(batch);
                    }
                    self.end_cycle();
                }
                LoopPhase::Draining => return self.drain_step(),
            }
        }
    }

    async fn next_batch(&mut self) -> Option<Vec<Record>> {
        loop {
            if let Some(batch) = self.pending.take() {
                match self.phase {
                    LoopPhase::Running => {
                        self.queue.wait_for_async(usize::MAX, self.retry_delay()).await
                    }
                    LoopPhase::Draining => tokio::time::sleep(self.retry_delay()).await,
                }
                return Some(batch);
            }

            match self.phase {
                LoopPhase::Running => {
                    let batch = self.assembler.collect(&self.queue).await;
                    if !batch.is_empty() {
                        return Some(batch);
                    }
                    self.end_cycle();
                }
                LoopPhase::Draining => return self.drain_step(),
            }
        }
    }

    fn drain_step(&mut self) -> Option<Vec<Record>> {
        let batch = self.assembler.collect_now(&self.queue);
        (!batch.is_empty()).then_some(batch)
    }

    fn complete(&mut self, batch: Vec<Record>, result: Result<(), AppendError>, elapsed: Duration) {
        let records = batch.len();
        match result {
            Ok(()) => {
                self.stats.batches_written += 1;
                self.stats.records_written += records as u64;
                self.observer.on_flush(records, elapsed);
            }
            Err(e) => {
                self.stats.failed_attempts += 1;
                self.observer.on_error(&e, records);
                self.pending = Some(batch);
            }
        }
        self.end_cycle();
    }

    fn end_cycle(&mut self) {
        if self.phase == LoopPhase::Running && !self.state.is_running() {
            tracing::debug!(
                "Stop requested, draining {} queued records",
                self.queue.len() + self.pending.as_ref().map_or(0, Vec::len)
            );
            self.phase = LoopPhase::Draining;
        }
    }

    fn finish(self) -> FlushStats {
        tracing::info!(
            "Flush loop finished: {} records in {} batches ({} failed attempts)",
            self.stats.records_written,
            self.stats.batches_written,
            self.stats.failed_attempts
        );
        self.stats
    }
}
