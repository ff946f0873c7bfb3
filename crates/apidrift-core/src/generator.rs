//! Code and build-file generation capability.
//!
//! The repair loop drives a [`CodeGenerator`] through four fixed operations.
//! Implementations talk to an LLM provider; tests use the scripted doubles
//! in [`crate::fakes`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ApiChange, Model, TestOutcome};

/// Failures raised while generating code or build files.
///
/// The repair loop converts every variant into a failing outcome for the
/// unit being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider {provider} returned {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("generator is not configured: {0}")]
    NotConfigured(String),
}

/// Result type for generator operations.
pub type GeneratorResult<T> = std::result::Result<T, GeneratorError>;

/// The four generation operations the repair loop depends on.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Produce a first implementation for `change`.
    async fn generate_code(&self, change: &ApiChange) -> GeneratorResult<String>;

    /// Produce a build file able to compile and test `code`.
    async fn generate_build_config(
        &self,
        change: &ApiChange,
        code: &str,
    ) -> GeneratorResult<String>;

    /// Produce a new implementation from the previous attempt and its outcome.
    async fn repair_code(
        &self,
        change: &ApiChange,
        previous_code: &str,
        previous_build: &str,
        previous_outcome: &TestOutcome,
    ) -> GeneratorResult<String>;

    /// Produce a new build file for the repaired implementation.
    async fn repair_build_config(
        &self,
        change: &ApiChange,
        new_code: &str,
        previous_code: &str,
        previous_build: &str,
        previous_outcome: &TestOutcome,
    ) -> GeneratorResult<String>;
}

/// Hands out the generator used for a given model.
pub trait GeneratorFactory: Send + Sync {
    fn for_model(&self, model: Model) -> GeneratorResult<Arc<dyn CodeGenerator>>;
}

/// Uses the same generator for every model.
impl GeneratorFactory for Arc<dyn CodeGenerator> {
    fn for_model(&self, _model: Model) -> GeneratorResult<Arc<dyn CodeGenerator>> {
        Ok(Arc::clone(self))
    }
}
