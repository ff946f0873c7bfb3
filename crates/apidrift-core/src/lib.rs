//! apidrift core library
//!
//! Measures how well code generators handle library API changes: every
//! change is paired with every model, each pair is driven through a
//! generate → test → repair loop against an isolated Gradle project, and the
//! final outcomes are collected in input order.

pub mod batch;
pub mod dispatcher;
pub mod domain;
pub mod fakes;
pub mod generator;
pub mod harness;
pub mod metrics;
pub mod repair_loop;
pub mod telemetry;

pub use batch::{read_batch, write_batch};
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use domain::{
    ApiChange, BatchResult, ChangeCategory, ChangeKind, EvalError, EvaluationUnit, Model,
    Provider, Result, TestCaseResult, TestOutcome, UnknownModel,
};
pub use generator::{CodeGenerator, GeneratorError, GeneratorFactory, GeneratorResult};
pub use harness::{GradleHarness, HarnessConfig, HarnessError, ProjectLayout, TestHarness};
pub use metrics::BatchCounters;
pub use repair_loop::{
    IterationArtifact, LoopEnding, LoopReport, RepairConfig, RepairLoop, Termination,
};
pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
