//! One evaluation run: read the batch, dispatch every unit, write results.

use std::sync::Arc;

use anyhow::{Context, Result};
use apidrift_core::{
    read_batch, write_batch, BatchResult, Dispatcher, EvaluationUnit, GeneratorFactory,
    GradleHarness, Model, TestHarness,
};
use apidrift_llm::{ChatClient, LlmGeneratorFactory};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::config::RunConfig;

/// Totals of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
}

/// Wires the LLM generators and the Gradle harness into a dispatcher.
pub struct BatchRunner {
    config: RunConfig,
    generators: Arc<dyn GeneratorFactory>,
    harness: Arc<dyn TestHarness>,
}

impl BatchRunner {
    pub fn new(config: RunConfig) -> Result<Self> {
        let client = ChatClient::new(config.llm.clone())
            .context("Failed to create LLM HTTP client")?;
        Ok(Self {
            generators: Arc::new(LlmGeneratorFactory::new(client)),
            harness: Arc::new(GradleHarness::new(config.harness.clone())),
            config,
        })
    }

    pub async fn run(&self) -> Result<RunSummary> {
        let changes = read_batch(&self.config.input)
            .with_context(|| format!("Failed to read batch {}", self.config.input.display()))?;
        let units = EvaluationUnit::expand(&changes, &self.config.models);
        info!(
            changes = changes.len(),
            models = %model_list(&self.config.models),
            units = units.len(),
            "starting evaluation"
        );

        let result = self.dispatch(units).await?;

        let output = &self.config.output;
        write_batch(output, &result)
            .with_context(|| format!("Failed to write results to {}", output.display()))?;

        Ok(RunSummary {
            total: result.len(),
            succeeded: result.succeeded(),
        })
    }

    async fn dispatch(&self, units: Vec<EvaluationUnit>) -> Result<BatchResult> {
        let progress = progress_bar(units.len() as u64, self.config.show_progress);
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.generators),
            Arc::clone(&self.harness),
            self.config.dispatch,
        )
        .with_progress(progress);

        let result = dispatcher.run(units).await.context("Evaluation aborted")?;
        Ok(result)
    }
}

fn model_list(models: &[Model]) -> String {
    models
        .iter()
        .map(|m| m.display_name())
        .collect::<Vec<_>>()
        .join(",")
}

fn progress_bar(length: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(length);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("units");
    pb
}
