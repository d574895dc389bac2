//! sluice - タスクファイルを in-memory キューに流してパイプラインを動かす
//!
//! Each non-empty line of `--tasks` is published as one message. Collaborators
//! are dry-run stand-ins that sleep for `--latency-ms` and can be told to fail
//! their first N calls, so retry and shutdown behaviour can be watched in the
//! logs without a broker.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use sluice_core::domain::{ReportPeriod, TaskError};
use sluice_core::impls::InMemoryQueueClient;
use sluice_core::ports::{QueueClient, ReportAnalyzer, ReportExtractor};
use sluice_core::{PipelineConfig, ProcessorBuilder, StopOutcome};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sluice", about = "Run the report task pipeline against a local task file")]
struct Args {
    /// YAML pipeline config; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// File with one JSON task per line
    #[arg(short, long)]
    tasks: PathBuf,

    /// Override the worker count
    #[arg(short, long)]
    workers: Option<usize>,

    /// Override the drain timeout used on shutdown
    #[arg(long)]
    drain_timeout_secs: Option<u64>,

    /// Simulated collaborator latency
    #[arg(long, default_value_t = 200)]
    latency_ms: u64,

    /// Fail this many collaborator calls before succeeding
    #[arg(long, default_value_t = 0)]
    fail_first: u32,

    /// Stop once every published message has been committed
    #[arg(long)]
    exit_when_idle: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

/// Stand-in for the real analysis/extraction services.
struct DryRunCollaborator {
    latency: Duration,
    remaining_failures: AtomicU32,
}

impl DryRunCollaborator {
    fn new(latency: Duration, fail_first: u32) -> Self {
        Self {
            latency,
            remaining_failures: AtomicU32::new(fail_first),
        }
    }

    async fn run(
        &self,
        op: &str,
        ticker: &str,
        report_url: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<String, TaskError> {
        tokio::time::sleep(self.latency).await;

        // decrement only while positive
        if let Ok(left) =
            self.remaining_failures
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
        {
            return Err(TaskError::failed(format!("intentional failure (left={left})")));
        }

        Ok(format!("{op} {ticker} {year} {period} ({report_url})"))
    }
}

#[async_trait]
impl ReportAnalyzer for DryRunCollaborator {
    async fn analyze_report(
        &self,
        ticker: &str,
        report_url: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<String, TaskError> {
        self.run("analyzed", ticker, report_url, year, period).await
    }
}

#[async_trait]
impl ReportExtractor for DryRunCollaborator {
    async fn extract_data_from_report(
        &self,
        ticker: &str,
        report_url: &str,
        year: i32,
        period: ReportPeriod,
    ) -> Result<String, TaskError> {
        self.run("extracted", ticker, report_url, year, period).await
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    }
    .apply_env()?;

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(secs) = args.drain_timeout_secs {
        config.drain_timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

/// SIGINT or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let config = load_config(&args)?;
    let tasks = std::fs::read_to_string(&args.tasks)
        .with_context(|| format!("reading tasks from {}", args.tasks.display()))?;

    let queue = Arc::new(InMemoryQueueClient::new());
    let mut published = 0u64;
    for line in tasks.lines().map(str::trim).filter(|line| !line.is_empty()) {
        queue.publish(line.as_bytes().to_vec()).await;
        published += 1;
    }
    info!(published, "tasks published");

    let collaborator = Arc::new(DryRunCollaborator::new(
        Duration::from_millis(args.latency_ms),
        args.fail_first,
    ));
    let mut processor = ProcessorBuilder::new(queue.clone())
        .config(&config)
        .analyzer(collaborator.clone())
        .extractor(collaborator)
        .build()?;

    let root = CancellationToken::new();
    processor.start(&root)?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                let stats = processor.stats();
                if args.exit_when_idle && stats.committed + stats.commit_failures >= published {
                    info!("all published messages settled");
                    break;
                }
            }
        }
    }

    match processor.stop(config.drain_timeout()).await {
        StopOutcome::Drained => info!("pipeline drained"),
        StopOutcome::TimedOut { abandoned } => {
            warn!(abandoned, "pipeline did not drain in time")
        }
    }
    queue.close().await?;

    println!("{}", serde_json::to_string_pretty(&processor.stats())?);
    Ok(())
}
