//! Picking stream - per-picker report of ambient picks
//!
//! Reads newline-delimited pick events from a file or stdin, stops after a
//! count or time limit, and writes one JSON document to a file or stdout.
//!
//! Module structure:
//! - `domain/` - Pick events and output document types
//! - `io/` - Line queue, line producer, output writer
//! - `services/` - Consumer pool, ingestion, aggregation, processor
//! - `infra/` - Config, metrics

use anyhow::Context;
use clap::Parser;
use picking_stream::infra::Config;
use picking_stream::services::{PickSource, PickingEventProcessorFactory, StreamProcessor};
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Picking stream - ambient picks per picker as JSON
#[derive(Parser, Debug)]
#[command(name = "picking-stream", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Input file with one JSON pick event per line (default: stdin)
    #[arg(short, long)]
    input: Option<String>,

    /// Output file for the JSON document (default: stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Maximum number of non-empty lines to read
    #[arg(long)]
    max_events: Option<usize>,

    /// Maximum time to spend reading, in milliseconds
    #[arg(long)]
    max_time_ms: Option<u64>,

    /// Number of parsing workers (0 = available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Pretty-print the output document
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON document
    // Default: INFO, use RUST_LOG=debug for per-line visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    let result = runtime.block_on(run(args));

    // A stdin read interrupted by the deadline stays parked on a blocking thread
    runtime.shutdown_background();
    result
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!(git_hash = %env!("GIT_HASH"), "picking-stream starting");

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(&[]),
    };
    if let Some(max_events) = args.max_events {
        config = config.with_max_events(max_events);
    }
    if let Some(ms) = args.max_time_ms {
        config = config.with_max_time_ms(ms);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if args.pretty {
        config = config.with_pretty(true);
    }

    info!(
        config_file = %config.config_file(),
        max_events = %config.max_events(),
        max_time_ms = %config.max_time_ms(),
        workers = %config.effective_workers(),
        line_queue_capacity = %config.line_queue_capacity(),
        pretty = %config.pretty(),
        "config_loaded"
    );

    let processor = PickingEventProcessorFactory::new().from_config(&config)?;

    let source: PickSource = match &args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let summary = match &args.output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output {}", path))?;
            let summary = processor.process(source, &mut file).await?;
            file.sync_all().await.context("Failed to sync output file")?;
            summary
        }
        None => {
            let mut stdout = tokio::io::stdout();
            let summary = processor.process(source, &mut stdout).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
            summary
        }
    };

    info!(
        pickers = %summary.pickers,
        picks = %summary.picks,
        bytes = %summary.bytes_written,
        deadline_exceeded = %summary.deadline_exceeded,
        "picking-stream finished"
    );
    Ok(())
}
