//! brecup: burn danmaku into recordings and upload them as one collection.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use brecup_media::CommandRunner;
use brecup_worker::{load_batch_config, run_batch, RunSummary, WorkerConfig, WorkerError};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "brecup", version, about = "Simplify the recorder to biliup workflow")]
struct Cli {
    /// Path to the batch file (YAML)
    config: PathBuf,

    /// Print every command instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Scratch directory for transcode logs (overrides BRECUP_WORK_DIR)
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

fn init_tracing() {
    // Colored output for terminals, JSON for log collectors
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let mut config = WorkerConfig::from_env();
    if let Some(work_dir) = cli.work_dir {
        config = config.with_work_dir(work_dir);
    }
    info!("Worker config: {:?}", config);

    let batch = load_batch_config(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let runner = CommandRunner::new().with_dry_run(cli.dry_run);
    let summary = run_batch(&batch, &config, runner).await?;
    Ok(summary)
}

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!("Starting brecup{}", if cli.dry_run { " (dry run)" } else { "" });

    // Dry runs use a single thread so the command sequence is reproducible.
    let runtime = if cli.dry_run {
        tokio::runtime::Builder::new_current_thread().enable_all().build()
    } else {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    };
    let runtime = match runtime {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli));
    // Drops every remaining task so child processes are killed before exit.
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);

    match result {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to render summary: {}", e),
            }
            info!("brecup finished");
        }
        Err(e) => {
            match e.downcast_ref::<WorkerError>().and_then(WorkerError::tool_exit_code) {
                Some(code) => error!(tool_exit_code = code, "brecup failed: {:#}", e),
                None => error!("brecup failed: {:#}", e),
            }
            std::process::exit(1);
        }
    }
}
