use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use gocmt::annotator::moonshot::MoonshotAnnotator;
use gocmt::cli::Cli;
use gocmt::config::{API_KEY_ENV, BASE_URL_ENV, Config, Credentials};
use gocmt::discovery::{self, Target};
use gocmt::formatter;
use gocmt::pipeline::progress::ConsoleReporter;
use gocmt::pipeline::{Pipeline, RunOutcome};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "logfile.log";

fn init_logging() -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("Failed to open log file {LOG_FILE}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Discover, then annotate. Credentials are only required once there is
/// something to send.
async fn run(target: &Target, config: &Config, api_key: Option<String>) -> Result<RunOutcome> {
    // 1. Discover
    let files = match discovery::discover(target) {
        Ok(files) => files,
        Err(e) => {
            error!("Discovery failed for {target:?}: {e}");
            return Err(e).context("failed to get go files");
        }
    };
    if files.is_empty() {
        info!("No go files found for {target:?}");
        println!("Hint: no go files found for processing.");
        return Ok(RunOutcome::NothingToDo);
    }

    // 2. Annotation service client
    let credentials = Credentials::from_value(api_key)?;
    let annotator = Arc::new(MoonshotAnnotator::new(&config.service, &credentials)?);

    // 3. Formatter
    let formatter = formatter::resolve(config.formatter);
    info!("Using {} formatter", formatter.name());

    // 4. Process
    let pipeline = Pipeline::new(annotator, formatter, config.concurrency);
    let summary = pipeline
        .run(files, Box::new(ConsoleReporter::default()))
        .await?;
    info!(
        "Run finished: {}/{} files succeeded, {} comments added",
        summary.succeeded, summary.total, summary.comments_added
    );
    Ok(RunOutcome::Completed(summary))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let mut config = Config::load(&cli.config)?;
    if let Some(n) = cli.concurrency {
        config.concurrency = n;
    }
    config.apply_base_url_override(std::env::var(BASE_URL_ENV).ok());
    config.validate()?;

    run(&cli.target(), &config, std::env::var(API_KEY_ENV).ok()).await?;
    Ok(())
}
