// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
mod common;

use common::{messages, CountingObserver, FlakySink, RecordingSink};
use durable_logger::{EventWriter, WriterConfig, WriterError};
use std::collections::HashSet;
use std::fs;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_single_producer_order_preserved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");

    let mut writer = EventWriter::open(
        WriterConfig::new(&path)
            .batch_size(4)
            .flush_interval(Duration::from_millis(20)),
    )
    .unwrap();

    let expected: Vec<String> = (0..50).map(|i| format!("Message: {i}")).collect();
    for m in &expected {
        writer.append(m.clone()).unwrap();
    }
    let stats = writer.stop().unwrap();

    assert_eq!(messages(&path), expected);
    assert_eq!(stats.records_written, 50);
}

#[test]
fn test_concurrent_producers_lose_nothing() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 250;

    for (batch_size, interval_ms) in [(1, 5), (10, 50), (1000, 1000)] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");

        let mut writer = EventWriter::open(
            WriterConfig::new(&path)
                .batch_size(batch_size)
                .flush_interval(Duration::from_millis(interval_ms)),
        )
        .unwrap();

        let handles: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let producer = writer.producer();
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        producer.append(format!("p{p}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        writer.stop().unwrap();

        let written = messages(&path);
        assert_eq!(written.len(), PRODUCERS * PER_PRODUCER);
        let distinct: HashSet<_> = written.iter().collect();
        assert_eq!(distinct.len(), PRODUCERS * PER_PRODUCER);

        // Each producer's own sequence stays in order
        for p in 0..PRODUCERS {
            let prefix = format!("p{p}-");
            let seq: Vec<usize> = written
                .iter()
                .filter_map(|m| m.strip_prefix(&prefix))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(seq, (0..PER_PRODUCER).collect::<Vec<_>>());
        }
    }
}

#[test]
fn test_no_write_exceeds_batch_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let sink = RecordingSink::new(&path);

    let mut writer = EventWriter::builder(
        WriterConfig::new(&path)
            .batch_size(7)
            .flush_interval(Duration::from_millis(10)),
    )
    .sink(sink.clone())
    .spawn()
    .unwrap();

    for i in 0..100 {
        writer.append(format!("m{i}")).unwrap();
        if i % 13 == 0 {
            thread::sleep(Duration::from_millis(3));
        }
    }
    writer.stop().unwrap();

    let batches = sink.batches();
    assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 7));
    assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 100);
}

#[test]
fn test_partial_batch_flushed_by_timeout() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");

    let mut writer = EventWriter::open(
        WriterConfig::new(&path)
            .batch_size(100)
            .flush_interval(Duration::from_millis(100)),
    )
    .unwrap();

    writer.append("first").unwrap();
    writer.append("second").unwrap();

    // Generous margin over the interval for slow CI machines
    thread::sleep(Duration::from_millis(1000));
    assert_eq!(messages(&path), vec!["first", "second"]);
    assert_eq!(writer.read_all().unwrap().len(), 2);

    writer.stop().unwrap();
}

#[test]
fn test_stop_on_empty_queue_leaves_file_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let existing = "2025-03-19 18:33:26: from a previous run\n";
    fs::write(&path, existing).unwrap();

    let mut writer = EventWriter::open(
        WriterConfig::new(&path).flush_interval(Duration::from_millis(10)),
    )
    .unwrap();
    thread::sleep(Duration::from_millis(50));
    let stats = writer.stop().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), existing);
    assert_eq!(stats.batches_written, 0);

    // A fresh path is not even created
    let fresh = dir.path().join("fresh.log");
    EventWriter::open(WriterConfig::new(&fresh)).unwrap().close().unwrap();
    assert!(!fresh.exists());
}

#[test]
fn test_batches_of_three_then_drain() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let sink = RecordingSink::new(&path);

    let mut writer = EventWriter::builder(
        WriterConfig::new(&path)
            .batch_size(3)
            .flush_interval(Duration::from_secs(1)),
    )
    .sink(sink.clone())
    .spawn()
    .unwrap();

    for m in ["a", "b", "c", "d"] {
        writer.append(m).unwrap();
    }
    writer.stop().unwrap();

    assert_eq!(sink.batches(), vec![vec!["a", "b", "c"], vec!["d"]]);
    assert_eq!(messages(&path), vec!["a", "b", "c", "d"]);
    let lines = writer.read_all().unwrap();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with(": a"));
}

#[test]
fn test_failed_sync_is_retried_without_loss_or_duplication() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");
    let sink = FlakySink::new(&path, 1);
    let remaining = sink.remaining();
    let observer = CountingObserver::default();

    let mut writer = EventWriter::builder(
        WriterConfig::new(&path)
            .batch_size(3)
            .flush_interval(Duration::from_millis(20)),
    )
    .sink(sink)
    .observer(observer.clone())
    .spawn()
    .unwrap();

    for m in ["a", "b", "c"] {
        writer.append(m).unwrap();
    }

    // Recovers on its own, before any stop
    thread::sleep(Duration::from_millis(500));
    assert_eq!(remaining.load(Ordering::SeqCst), 0);
    assert_eq!(messages(&path), vec!["a", "b", "c"]);

    writer.append("d").unwrap();
    let stats = writer.stop().unwrap();

    assert_eq!(messages(&path), vec!["a", "b", "c", "d"]);
    assert_eq!(stats.failed_attempts, 1);
    assert_eq!(stats.records_written, 4);
    assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
    assert_eq!(observer.flushes.load(Ordering::SeqCst) as u64, stats.batches_written);
}

#[test]
fn test_failures_during_drain_still_deliver() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");

    let mut writer = EventWriter::builder(
        WriterConfig::new(&path)
            .batch_size(2)
            .flush_interval(Duration::from_millis(50)),
    )
    .sink(FlakySink::new(&path, 3))
    .spawn()
    .unwrap();

    for i in 0..5 {
        writer.append(format!("m{i}")).unwrap();
    }
    let stats = writer.stop().unwrap();

    assert_eq!(messages(&path), vec!["m0", "m1", "m2", "m3", "m4"]);
    assert_eq!(stats.failed_attempts, 3);
}

#[test]
fn test_append_after_stop_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");

    let mut writer = EventWriter::open(WriterConfig::new(&path)).unwrap();
    let producer = writer.producer();
    producer.append("ok").unwrap();
    writer.stop().unwrap();

    assert!(matches!(writer.append("late"), Err(WriterError::UseAfterStop)));
    assert!(matches!(producer.append("late"), Err(WriterError::UseAfterStop)));
    assert_eq!(messages(&path), vec!["ok"]);
}

#[test]
fn test_stop_does_not_wait_for_interval() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");

    let mut writer = EventWriter::open(
        WriterConfig::new(&path)
            .batch_size(100)
            .flush_interval(Duration::from_secs(60)),
    )
    .unwrap();
    writer.append("x").unwrap();

    let start = std::time::Instant::now();
    writer.stop().unwrap();
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(messages(&path), vec!["x"]);
}

#[test]
fn test_unbounded_flush_interval_still_drains_on_stop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.log");

    let mut writer = EventWriter::open(
        WriterConfig::new(&path)
            .batch_size(10)
            .flush_interval(Duration::MAX),
    )
    .unwrap();
    writer.append("a").unwrap();

    let stats = writer.stop().unwrap();
    assert_eq!(messages(&path), vec!["a"]);
    assert_eq!(stats.records_written, 1);
}
