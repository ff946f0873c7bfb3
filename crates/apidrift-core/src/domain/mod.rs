//! Domain models for apidrift.
//!
//! - `ApiChange`: immutable description of one API change
//! - `Model`: fixed catalogue of evaluated models
//! - `EvaluationUnit`: one change paired with one model
//! - `TestOutcome` / `BatchResult`: harness results and the final batch

pub mod api_change;
pub mod error;
pub mod model;
pub mod outcome;
pub mod unit;

pub use api_change::{ApiChange, ChangeCategory, ChangeKind};
pub use error::{EvalError, Result};
pub use model::{Model, Provider, UnknownModel};
pub use outcome::{BatchResult, TestCaseResult, TestOutcome};
pub use unit::EvaluationUnit;
