// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Result;
use clap::{Parser, ValueEnum};
use durable_logger::{telemetry, AsyncEventWriter, EventWriter, FlushStats, WriterConfig};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Flush loop on a dedicated thread, one producer thread per message
    Thread,
    /// Flush loop as a tokio task, one producer task per message
    Task,
}

#[derive(Parser)]
#[command(name = "durable-logger-demo")]
#[command(about = "Drive the batched durable logger with concurrent producers", long_about = None)]
struct Cli {
    /// Log file to append to
    #[arg(long, default_value = "events.log")]
    file: PathBuf,

    #[arg(long, value_enum, default_value = "thread")]
    backend: Backend,

    /// Number of concurrent producers (each appends one message)
    #[arg(long, short, default_value_t = 11)]
    producers: usize,

    #[arg(long, default_value_t = 10)]
    batch_size: usize,

    #[arg(long, default_value_t = 1000)]
    flush_interval_ms: u64,

    /// Delay between producer launches
    #[arg(long, default_value_t = 0)]
    stagger_ms: u64,
}

fn run_threads(cli: &Cli, config: WriterConfig) -> Result<FlushStats> {
    let mut writer = EventWriter::open(config)?;

    let handles: Vec<_> = (0..cli.producers)
        .map(|i| {
            let producer = writer.producer();
            thread::sleep(Duration::from_millis(cli.stagger_ms));
            thread::spawn(move || producer.append(format!("Message: {i}")))
        })
        .collect();

    for handle in handles.into_iter().rev() {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
    }

    Ok(writer.stop()?)
}

async fn run_tasks(cli: &Cli, config: WriterConfig) -> Result<FlushStats> {
    let mut writer = AsyncEventWriter::open(config)?;

    let mut tasks = Vec::with_capacity(cli.producers);
    for i in 0..cli.producers {
        let producer = writer.producer();
        tasks.push(tokio::spawn(async move { producer.append(format!("Message: {i}")) }));
        tokio::time::sleep(Duration::from_millis(cli.stagger_ms)).await;
    }
    for task in tasks {
        task.await??;
    }

    Ok(writer.stop().await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    telemetry::describe_metrics();
    let cli = Cli::parse();

    let config = WriterConfig::new(&cli.file)
        .batch_size(cli.batch_size)
        .flush_interval(Duration::from_millis(cli.flush_interval_ms));
    config.validate()?;

    tracing::info!("Running {:?} backend with config: {:?}", cli.backend, config);

    let stats = match cli.backend {
        Backend::Thread => tokio::task::block_in_place(|| run_threads(&cli, config))?,
        Backend::Task => run_tasks(&cli, config).await?,
    };

    println!(
        "Wrote {} records in {} batches ({} failed attempts)",
        stats.records_written, stats.batches_written, stats.failed_attempts
    );
    for line in durable_logger::reader::read_all(&cli.file)? {
        println!("Log: {line}");
    }

    Ok(())
}
