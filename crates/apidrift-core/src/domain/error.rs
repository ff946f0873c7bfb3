//! Engine-level error taxonomy.
//!
//! Only configuration problems and batch I/O surface as errors. Generator
//! failures, build failures and consistency violations are folded into
//! failing [`TestOutcome`](super::outcome::TestOutcome)s per unit.

use std::path::PathBuf;

/// Errors that abort a whole evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("batch file not found: {}", .0.display())]
    BatchNotFound(PathBuf),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// Whether this error must stop every remaining unit.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EvalError::Configuration(_))
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EvalError>;
