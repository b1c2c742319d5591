use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use guardia::{
    actors::{executor::CheckExecutor, messages::EngineEvent, scheduler::SchedulerHandle},
    check::{CheckJob, CheckResult},
    config::read_config_file,
    scheduler::Scheduler,
    util::{get_config_path, get_cycle_interval_ms},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, instrument, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (falls back to $SCHEDULER_CONFIG)
    #[arg(short, long)]
    file: Option<String>,

    /// Milliseconds between two cycles, overrides the config file
    #[arg(long)]
    cycle_ms: Option<u64>,
}

fn init() {
    dotenv::dotenv().ok();

    let filter = filter::Targets::new().with_targets(vec![
        ("guardia", LevelFilter::DEBUG),
        ("guardia_scheduler", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

/// Writes every job as one JSON line on stdout for an external worker
struct StdoutExecutor {
    stdout: Mutex<tokio::io::Stdout>,
}

#[async_trait]
impl CheckExecutor for StdoutExecutor {
    async fn launch(&self, job: CheckJob) -> Result<()> {
        let mut line = serde_json::to_string(&job).context("failed to encode job")?;
        line.push('\n');

        let mut stdout = self.stdout.lock().await;
        stdout
            .write_all(line.as_bytes())
            .await
            .context("failed to write job")?;
        stdout.flush().await.context("failed to flush stdout")?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let path = args.file.clone().unwrap_or_else(get_config_path);
    let mut config = read_config_file(&path)?;
    if let Some(cycle_ms) = args.cycle_ms.or_else(get_cycle_interval_ms) {
        config.scheduler.cycle_interval_ms = cycle_ms;
    }

    let scheduler = match Scheduler::new(&config, chrono::Utc::now()) {
        Ok(scheduler) => scheduler,
        Err(invalid) => {
            for e in &invalid.errors {
                error!("{e}");
            }
            anyhow::bail!("refusing to start with an invalid configuration ({path})");
        }
    };

    let (event_tx, event_rx) = broadcast::channel(256);
    let executor = Arc::new(StdoutExecutor {
        stdout: Mutex::new(tokio::io::stdout()),
    });
    let handle = SchedulerHandle::spawn(scheduler, executor, event_tx);
    info!("scheduler started from {path}");

    tokio::spawn(log_events(event_rx));

    tokio::select! {
        result = read_input(handle.clone(), path) => {
            if let Err(e) = result {
                error!("input stream failed: {e:#}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            debug!("received ctrl-c");
        }
    }

    handle.shutdown().await?;
    Ok(())
}

/// Feed stdin into the scheduler
///
/// JSON lines are check results, `RELOAD` re-reads the config file and
/// anything else is an external command.
#[instrument(skip(handle))]
async fn read_input(handle: SchedulerHandle, path: String) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('{') {
            match serde_json::from_str::<CheckResult>(line) {
                Ok(result) => handle.submit_result(result).await?,
                Err(e) => warn!("ignoring malformed check result: {e}"),
            }
        } else if line == "RELOAD" {
            reload_from_file(&handle, &path).await;
        } else {
            handle.send_external_command(line).await?;
        }
    }

    debug!("stdin closed");
    Ok(())
}

/// Re-read `path` and swap it in; on any failure the running topology stays
async fn reload_from_file(handle: &SchedulerHandle, path: &str) -> bool {
    let config = match read_config_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("reload refused: {e:#}");
            return false;
        }
    };

    match handle.reload(config).await {
        Ok(()) => {
            info!("configuration reloaded");
            true
        }
        Err(e) => {
            error!("reload refused: {e:#}");
            false
        }
    }
}

async fn log_events(mut event_rx: broadcast::Receiver<EngineEvent>) {
    loop {
        match event_rx.recv().await {
            Ok(EngineEvent::HardStateChange {
                item,
                previous,
                state,
                output,
                ..
            }) => info!("{item}: {previous:?} -> {state:?} (HARD) {output}"),
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => trace!("{json}"),
                Err(e) => warn!("failed to encode event: {e}"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("event log lagging, skipped {skipped} events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
