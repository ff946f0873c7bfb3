//! apidrift - LLM evaluation on library API changes
//!
//! Reads a batch of API changes, asks every selected model to implement each
//! one, runs the change's acceptance test with Gradle, feeds failures back
//! for repair, and writes one result per (change, model) pair.

mod config;
mod runner;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use apidrift_core::telemetry::{init_tracing, level_for};

use crate::config::Cli;
use crate::runner::BatchRunner;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json, level_for(cli.verbose));

    let config = cli.into_run_config()?;
    let output = config.output.clone();

    let summary = BatchRunner::new(config)?.run().await?;

    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        output = %output.display(),
        "evaluation finished"
    );
    println!("Total: {}, Success: {}", summary.total, summary.succeeded);
    Ok(())
}
