//! Generate → test → repair state machine for one evaluation unit.
//!
//! ```text
//! Create ──► Repair(0) ──► Repair(1) ──► … ──► Done(Exhausted)
//!               │             │
//!               └─────────────┴──────────────► Done(Success)
//! ```
//!
//! `Create` asks the generator for code and a build file. Each `Repair`
//! step tests the current artifact, stops on an accepted outcome, and
//! otherwise asks the generator for a repaired artifact until the iteration
//! budget is spent. An outcome is accepted only when it passed *and* echoes
//! the exact change under test.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::{EvalError, EvaluationUnit, TestOutcome};
use crate::generator::{CodeGenerator, GeneratorError};
use crate::harness::{HarnessError, TestHarness};

/// Diagnostic attached when an outcome echoes a different change.
pub const CHANGE_MISMATCH: &str = "API change mismatch";

const NO_OUTCOME: &str = "No test run was recorded";

/// Repair loop configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Maximum number of failed test runs before giving up.
    pub max_iterations: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self { max_iterations: 15 }
    }
}

/// Generator state carried from one repair step to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationArtifact {
    pub code: Option<String>,
    pub build: Option<String>,
    pub last_outcome: Option<TestOutcome>,
}

/// Terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Success,
    Exhausted,
}

#[derive(Debug)]
enum LoopState {
    Create,
    Repair {
        artifact: IterationArtifact,
        iteration: u32,
    },
    Done(Termination),
}

/// How the loop ended, including a caught failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEnding {
    Finished(Termination),
    Failed(String),
}

/// Final result of one loop, with counters for diagnostics.
#[derive(Debug, Clone)]
pub struct LoopReport {
    pub outcome: TestOutcome,
    pub ending: LoopEnding,
    /// Number of harness invocations.
    pub harness_runs: u32,
    /// Whether any outcome echoed a different change.
    pub guard_tripped: bool,
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Harness(#[from] HarnessError),
}

/// What the loop has observed so far; survives a failed step.
#[derive(Debug, Default)]
struct Observations {
    last_outcome: Option<TestOutcome>,
    harness_runs: u32,
    guard_tripped: bool,
}

/// Drives one [`EvaluationUnit`] to a terminal state.
pub struct RepairLoop {
    unit: EvaluationUnit,
    generator: Arc<dyn CodeGenerator>,
    harness: Arc<dyn TestHarness>,
    config: RepairConfig,
}

impl RepairLoop {
    pub fn new(
        unit: EvaluationUnit,
        generator: Arc<dyn CodeGenerator>,
        harness: Arc<dyn TestHarness>,
        config: RepairConfig,
    ) -> Self {
        Self {
            unit,
            generator,
            harness,
            config,
        }
    }

    /// Run the loop to completion.
    ///
    /// Generator failures end the loop with a failing outcome. Only a
    /// harness configuration problem is returned as an error, since it
    /// affects every unit.
    #[instrument(
        skip_all,
        fields(unit_id = %self.unit.id, model = %self.unit.model, change = %self.unit.change.name)
    )]
    pub async fn run(self) -> Result<LoopReport, EvalError> {
        let mut seen = Observations::default();

        let ending = match self.drive(&mut seen).await {
            Ok(termination) => LoopEnding::Finished(termination),
            Err(StepError::Harness(e)) => return Err(EvalError::Configuration(e.to_string())),
            Err(StepError::Generator(e)) => {
                warn!(error = %e, "generator failed; ending unit");
                LoopEnding::Failed(e.to_string())
            }
        };

        let outcome = self.finish(&mut seen, &ending);
        info!(
            success = outcome.success,
            harness_runs = seen.harness_runs,
            guard_tripped = seen.guard_tripped,
            "unit finished"
        );

        Ok(LoopReport {
            outcome,
            ending,
            harness_runs: seen.harness_runs,
            guard_tripped: seen.guard_tripped,
        })
    }

    async fn drive(&self, seen: &mut Observations) -> Result<Termination, StepError> {
        let mut state = LoopState::Create;
        loop {
            state = match state {
                LoopState::Done(termination) => return Ok(termination),
                LoopState::Create => self.create().await?,
                LoopState::Repair {
                    artifact,
                    iteration,
                } => self.repair(artifact, iteration, seen).await?,
            };
        }
    }

    async fn create(&self) -> Result<LoopState, StepError> {
        let change = &self.unit.change;
        let code = self.generator.generate_code(change).await?;
        let build = self.generator.generate_build_config(change, &code).await?;
        debug!(
            code_len = code.len(),
            build_len = build.len(),
            "generated initial artifact"
        );

        Ok(LoopState::Repair {
            artifact: IterationArtifact {
                code: Some(code),
                build: Some(build),
                last_outcome: None,
            },
            iteration: 0,
        })
    }

    async fn repair(
        &self,
        artifact: IterationArtifact,
        iteration: u32,
        seen: &mut Observations,
    ) -> Result<LoopState, StepError> {
        let change = &self.unit.change;
        let code = artifact.code.unwrap_or_default();
        let build = artifact.build.unwrap_or_default();

        seen.harness_runs += 1;
        let outcome = self.harness.execute(change, &code, &build).await?;
        seen.last_outcome = Some(outcome.clone());

        if outcome.is_accepted_for(change) {
            debug!(iteration, "acceptance test passed");
            return Ok(LoopState::Done(Termination::Success));
        }

        if !outcome.matches(change) {
            seen.guard_tripped = true;
            warn!(iteration, "outcome reported for a different API change");
        }

        let iteration = iteration + 1;
        if iteration >= self.config.max_iterations {
            info!(iteration, "repair budget exhausted");
            return Ok(LoopState::Done(Termination::Exhausted));
        }

        debug!(iteration, "repairing after failed test run");
        let new_code = self
            .generator
            .repair_code(change, &code, &build, &outcome)
            .await?;
        let new_build = self
            .generator
            .repair_build_config(change, &new_code, &code, &build, &outcome)
            .await?;

        Ok(LoopState::Repair {
            artifact: IterationArtifact {
                code: Some(new_code),
                build: Some(new_build),
                last_outcome: Some(outcome),
            },
            iteration,
        })
    }

    fn finish(&self, seen: &mut Observations, ending: &LoopEnding) -> TestOutcome {
        let model = self.unit.model.display_name();
        let caught = match ending {
            LoopEnding::Failed(message) => Some(message.as_str()),
            LoopEnding::Finished(_) => None,
        };

        let mut outcome = match seen.last_outcome.take() {
            Some(outcome) => outcome,
            None => TestOutcome::failure(&self.unit.change, caught.unwrap_or(NO_OUTCOME)),
        };

        if ending == &LoopEnding::Finished(Termination::Success) {
            return outcome.with_model(model);
        }

        if outcome.error_output.is_none() {
            outcome.error_output = caught.map(str::to_string);
        }
        if seen.guard_tripped {
            outcome.success = false;
            if outcome.error_output.is_none() {
                outcome.error_output = Some(CHANGE_MISMATCH.to_string());
            }
        }
        outcome.with_model(model)
    }
}
