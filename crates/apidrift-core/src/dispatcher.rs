//! Bounded-concurrency execution of evaluation units.
//!
//! Every unit gets its own task running a [`RepairLoop`]; a semaphore caps
//! how many run at once. Outcomes are collected in input order regardless of
//! completion order, re-checked against the unit's change, and counted.
//! A configuration error closes the semaphore so no further unit starts,
//! and the run returns that error.

use std::sync::Arc;

use futures::future::join_all;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::domain::{ApiChange, BatchResult, EvalError, EvaluationUnit, TestOutcome};
use crate::generator::GeneratorFactory;
use crate::harness::TestHarness;
use crate::metrics::BatchCounters;
use crate::repair_loop::{RepairConfig, RepairLoop, CHANGE_MISMATCH};

/// Dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of units running at once.
    pub workers: usize,
    /// Iteration budget handed to every repair loop.
    pub max_iterations: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            max_iterations: RepairConfig::default().max_iterations,
        }
    }
}

/// What one unit task hands back.
enum UnitResult {
    Finished(TestOutcome),
    /// The semaphore was closed before the unit started.
    Skipped,
    Aborted(EvalError),
}

/// Runs units against a shared harness and per-model generators.
pub struct Dispatcher {
    generators: Arc<dyn GeneratorFactory>,
    harness: Arc<dyn TestHarness>,
    config: DispatchConfig,
    counters: Arc<BatchCounters>,
    progress: ProgressBar,
}

impl Dispatcher {
    pub fn new(
        generators: Arc<dyn GeneratorFactory>,
        harness: Arc<dyn TestHarness>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            generators,
            harness,
            config,
            counters: Arc::new(BatchCounters::new()),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report progress on `bar` instead of the default hidden one.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = bar;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Live counters for the current run.
    pub fn counters(&self) -> Arc<BatchCounters> {
        Arc::clone(&self.counters)
    }

    /// Run every unit and return their outcomes in input order.
    #[instrument(skip_all, fields(units = units.len(), workers = self.config.workers))]
    pub async fn run(&self, units: Vec<EvaluationUnit>) -> Result<BatchResult, EvalError> {
        self.counters.reset();
        self.progress.set_length(units.len() as u64);
        self.progress.set_position(0);

        let sem = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let tasks: Vec<JoinHandle<UnitResult>> = units
            .iter()
            .map(|unit| self.spawn_unit(unit.clone(), Arc::clone(&sem)))
            .collect();

        // join_all keeps input order whatever the completion order
        let joined = join_all(tasks).await;

        let mut outcomes = Vec::with_capacity(joined.len());
        let mut failure: Option<EvalError> = None;

        for (unit, joined) in units.into_iter().zip(joined) {
            match joined {
                Ok(UnitResult::Finished(outcome)) => outcomes.push(outcome),
                Ok(UnitResult::Skipped) => {}
                Ok(UnitResult::Aborted(e)) => {
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
                Err(join_err) => {
                    warn!(unit_id = %unit.id, error = %join_err, "evaluation task panicked");
                    let outcome = TestOutcome::failure(
                        &unit.change,
                        format!("evaluation task panicked: {join_err}"),
                    )
                    .with_model(unit.model.display_name());
                    tally(&self.counters, &self.progress, outcome.success);
                    outcomes.push(outcome);
                }
            }
        }

        self.progress.finish();
        self.counters.flush();

        match failure {
            Some(e) => Err(e),
            None => Ok(BatchResult::new(outcomes)),
        }
    }

    fn spawn_unit(&self, unit: EvaluationUnit, sem: Arc<Semaphore>) -> JoinHandle<UnitResult> {
        let generators = Arc::clone(&self.generators);
        let harness = Arc::clone(&self.harness);
        let counters = Arc::clone(&self.counters);
        let progress = self.progress.clone();
        let repair = RepairConfig {
            max_iterations: self.config.max_iterations,
        };

        tokio::spawn(async move {
            let _permit = match Arc::clone(&sem).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return UnitResult::Skipped,
            };

            let change = unit.change.clone();
            let generator = match generators.for_model(unit.model) {
                Ok(generator) => generator,
                Err(e) => {
                    sem.close();
                    return UnitResult::Aborted(EvalError::Configuration(e.to_string()));
                }
            };

            let repair_loop = RepairLoop::new(unit, generator, harness, repair);
            let report = match repair_loop.run().await {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %e, "aborting run");
                    sem.close();
                    return UnitResult::Aborted(e);
                }
            };

            let outcome = verify(report.outcome, &change);
            tally(&counters, &progress, outcome.success);

            UnitResult::Finished(outcome)
        })
    }
}

fn tally(counters: &BatchCounters, progress: &ProgressBar, success: bool) {
    let (completed, succeeded) = counters.record(success);
    progress.inc(1);
    info!("Total: {completed}, Success: {succeeded}");
}

/// Force failure for an outcome that does not echo `change`.
fn verify(mut outcome: TestOutcome, change: &ApiChange) -> TestOutcome {
    if !outcome.matches(change) {
        warn!(change = %change.name, "final outcome belongs to a different API change");
        outcome.success = false;
        outcome.output = Some(CHANGE_MISMATCH.to_string());
    }
    outcome
}
