//! `spool` - command line front end for the task queue.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use spool_core::domain::TaskKind;
use spool_core::impls::FileTaskStore;
use spool_core::intake::{BackendClient, ReportingHandler};
use spool_core::runtime::HandlerRegistry;
use spool_core::{QueueBuilder, QueueManager, SpoolConfig};

#[derive(Parser)]
#[command(
    name = "spool",
    version,
    about = "Persistent task queue with remote dispatch and local fallback"
)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a task; identical pending tasks are not duplicated
    Enqueue {
        /// Task kind, e.g. `render`
        kind: String,
        /// Task parameters as a JSON value
        params: String,
        #[arg(long, short, default_value_t = 0, allow_hyphen_values = true)]
        priority: i64,
    },
    /// Run one processing pass
    Process,
    /// Print queue status as JSON
    Status,
    /// Remove processed tasks older than the given age
    Prune {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Poll the backend and process the queue until interrupted
    Worker,
}

fn init_tracing(debug: bool) {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let default_level = if debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(false),
            )
            .with(env_filter)
            .init();
    }
}

fn build_registry(
    config: &SpoolConfig,
    backend: Option<&BackendClient>,
) -> Result<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    if let Some(command) = config.render_handler()? {
        match backend {
            Some(client) => registry.register(
                TaskKind::new("render"),
                Arc::new(ReportingHandler::new(command, client.clone())),
            )?,
            None => registry.register(TaskKind::new("render"), Arc::new(command))?,
        }
    }
    Ok(registry)
}

async fn open_queue(
    config: &SpoolConfig,
    backend: Option<&BackendClient>,
    expected: &[&str],
) -> Result<QueueManager> {
    let store = FileTaskStore::open(&config.queue_dir)
        .await
        .with_context(|| format!("opening queue at {}", config.queue_dir.display()))?;

    let queue = QueueBuilder::new(Arc::new(store))
        .dispatcher(config.dispatcher()?)
        .registry(build_registry(config, backend)?)
        .options(config.queue_options())
        .expect_kinds(expected)
        .open()
        .await?;
    Ok(queue)
}

async fn run_worker(config: &SpoolConfig) -> Result<()> {
    let backend = config
        .backend_url
        .as_deref()
        .map(BackendClient::new)
        .transpose()?;
    let mut queue = open_queue(config, backend.as_ref(), &["render"]).await?;

    info!(
        backend = config.backend_url.as_deref().unwrap_or("-"),
        webhook = config.webhook_url.as_deref().unwrap_or("-"),
        poll_secs = config.poll_interval.as_secs(),
        "worker started"
    );

    let (shutdown_tx, mut shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            let _ = shutdown_tx.send(true);
        }
    });

    while !*shutdown.borrow() {
        if let Some(client) = &backend {
            if let Some(job) = client.fetch_pending().await {
                match job.into_render_task() {
                    Ok(task) => {
                        queue.enqueue_typed(&task, 0).await?;
                    }
                    Err(e) => warn!(error = %e, "skipping backend job"),
                }
            }
        }

        if let Err(e) = queue.process_all().await {
            error!(error = %e, "processing pass aborted");
        }

        tokio::select! {
            Ok(()) = shutdown.changed() => {}
            _ = tokio::time::sleep(config.poll_interval) => {}
        }
    }
    info!("worker stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = SpoolConfig::from_env();

    match cli.command {
        Commands::Enqueue {
            kind,
            params,
            priority,
        } => {
            let params: serde_json::Value =
                serde_json::from_str(&params).context("task parameters must be valid JSON")?;
            let mut queue = open_queue(&config, None, &[]).await?;
            let task_id = queue.enqueue(kind, params, priority).await?;
            println!("{task_id}");
        }
        Commands::Process => {
            let backend = config
                .backend_url
                .as_deref()
                .map(BackendClient::new)
                .transpose()?;
            let mut queue = open_queue(&config, backend.as_ref(), &[]).await?;
            let summary = queue.process_all().await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Status => {
            let queue = open_queue(&config, None, &[]).await?;
            println!("{}", serde_json::to_string_pretty(&queue.status())?);
        }
        Commands::Prune { days } => {
            let mut queue = open_queue(&config, None, &[]).await?;
            let removed = queue.prune(days).await?;
            println!("{removed}");
        }
        Commands::Worker => run_worker(&config).await?,
    }
    Ok(())
}
