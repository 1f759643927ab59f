use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use logscan_ingest::IngestCoordinator;

mod config;
mod report;

use config::AppConfig;
use report::OutputFormat;

/// Logscan - scan a directory of log files and summarize levels, sources
/// and message templates
#[derive(Parser, Debug)]
#[command(name = "logscan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory to scan recursively (a single file also works)
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Worker pool size (default: available parallelism, at least 2)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of sources and messages to rank
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Give up on a single file after this many seconds
    #[arg(long, value_name = "SECS")]
    file_timeout: Option<u64>,

    /// Stop waiting for the worker pool after this many seconds
    #[arg(long, value_name = "SECS")]
    shutdown_timeout: Option<u64>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// TOML config file (default: $LOGSCAN_CONFIG if set)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase diagnostic output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command-line flags win over file and environment settings
    fn apply(&self, config: &mut AppConfig) {
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(secs) = self.file_timeout {
            config.file_timeout_secs = Some(secs);
        }
        if let Some(secs) = self.shutdown_timeout {
            config.shutdown_timeout_secs = secs;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to stderr so the report can be piped
    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    args.apply(&mut config);
    config.validate()?;

    let coordinator =
        IngestCoordinator::new(config.ingest_config()).context("failed to set up ingest")?;

    // Ctrl-C stops queued and in-flight files; what was counted is still reported
    let cancel = coordinator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, reporting partial results");
            cancel.cancel();
        }
    });

    let report = coordinator
        .run(&args.root)
        .await
        .with_context(|| format!("failed to scan {}", args.root.display()))?;

    let output = report::render(&report, config.top_k, config.format)
        .context("failed to render report")?;
    println!("{}", output.trim_end());

    Ok(())
}
