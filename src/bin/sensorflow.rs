//! Thin CLI binary. Wires file input, mode selection and console sinks to
//! the core pipeline; not part of the testable core surface.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sensorflow::config::PipelineConfig;
use sensorflow::coordinator::PipelineCoordinator;
use sensorflow::pool::WorkerPool;
use sensorflow::sinks::{ConsoleTransport, Sink, SinkRegistry, TextFormatter};
use sensorflow::stream_queue::StreamingQueue;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "sensorflow", about = "Ingest/fan-out pipeline for sensor telemetry")]
struct Cli {
    /// Path to the line-oriented sensor data file.
    #[arg(default_value = "sensor_data.txt")]
    file: PathBuf,

    /// Execution mode; prompted interactively when omitted on a TTY.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Optional RON config file overlaying PipelineConfig::default().
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    Sequential,
    Pool,
    Stream,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path).context("loading pipeline config")?,
        None => PipelineConfig::default(),
    };

    let mut sinks = SinkRegistry::new();
    sinks.add(Sink::new(Box::new(TextFormatter), Box::new(ConsoleTransport)));

    let coordinator = Arc::new(PipelineCoordinator::new(&config, sinks));

    let lines = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("reading sensor data file {}", cli.file.display()))?;
    let lines: Vec<String> = lines.lines().map(str::to_string).collect();

    let mode = cli.mode.unwrap_or_else(prompt_for_mode);

    match mode {
        Mode::Sequential => {
            for line in &lines {
                coordinator.process_record(line).await;
            }
        }
        Mode::Pool => {
            let pool = match config.pool_parallelism {
                Some(n) => WorkerPool::new(n),
                None => WorkerPool::default(),
            };
            let coordinator = coordinator.clone();
            pool.process_batch(lines, move |line| {
                let coordinator = coordinator.clone();
                async move {
                    coordinator.process_record(&line).await;
                }
            })
            .await;
        }
        Mode::Stream => {
            let queue: StreamingQueue<String> = StreamingQueue::new(config.queue_capacity);
            let consumer_coordinator = coordinator.clone();
            queue
                .start(move |line: String| {
                    let coordinator = consumer_coordinator.clone();
                    async move {
                        coordinator.process_record(&line).await;
                    }
                })
                .await
                .context("starting streaming queue consumer")?;

            for line in lines {
                queue.produce(line).await.context("producing to streaming queue")?;
            }
            queue.stop().await.context("stopping streaming queue")?;
        }
    }

    Arc::try_unwrap(coordinator)
        .map_err(|_| anyhow::anyhow!("coordinator still has outstanding references"))?
        .shutdown()
        .await
        .context("shutting down actor subsystem")?;

    Ok(())
}

fn prompt_for_mode() -> Mode {
    if !std::io::stdin().is_terminal() {
        return Mode::Sequential;
    }
    println!("Select mode: 1) sequential  2) pool  3) stream");
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return Mode::Sequential;
    }
    match input.trim() {
        "2" => Mode::Pool,
        "3" => Mode::Stream,
        _ => Mode::Sequential,
    }
}
