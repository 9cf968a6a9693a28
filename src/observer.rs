// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Observability hook for the flush loop.
//!
//! Append failures never reach producers. They are reported here, and the
//! loop keeps the batch for the next attempt.

use crate::appender::AppendError;
use std::time::Duration;

pub trait FlushObserver: Send + Sync + 'static {
    /// A batch of `records` was durably written.
    fn on_flush(&self, records: usize, elapsed: Duration) {
        let _ = (records, elapsed);
    }

    /// Writing a batch of `records` failed; it will be retried.
    fn on_error(&self, error: &AppendError, records: usize) {
        let _ = (error, records);
    }
}

/// Default observer: structured logs plus `metrics` counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FlushObserver for TracingObserver {
    fn on_flush(&self, records: usize, elapsed: Duration) {
        tracing::debug!("Flushed {} records in {:?}", records, elapsed);
        metrics::counter!("durable_logger_batches_flushed_total", 1);
        metrics::counter!("durable_logger_records_flushed_total", records as u64);
        metrics::histogram!("durable_logger_flush_duration_seconds", elapsed.as_secs_f64());
    }

    fn on_error(&self, error: &AppendError, records: usize) {
        tracing::warn!("Append of {} records failed, will retry: {}", records, error);
        metrics::counter!("durable_logger_flush_failures_total", 1);
    }
}
