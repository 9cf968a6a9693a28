// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing for binaries and demos.
///
/// Honors `RUST_LOG`, defaulting to `durable_logger=info`. Safe to call
/// more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "durable_logger=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Register descriptions for the metrics emitted by [`crate::TracingObserver`].
/// Only useful once the host application has installed a recorder.
pub fn describe_metrics() {
    metrics::describe_counter!("durable_logger_batches_flushed_total", "Batches durably written");
    metrics::describe_counter!("durable_logger_records_flushed_total", "Records durably written");
    metrics::describe_counter!("durable_logger_flush_failures_total", "Failed batch append attempts");
    metrics::describe_histogram!(
        "durable_logger_flush_duration_seconds",
        "Time taken to write and fsync one batch"
    );
}
