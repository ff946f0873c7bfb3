//! Isolated test execution.
//!
//! A [`TestHarness`] materializes a throwaway build project for one
//! generated implementation, runs the change's acceptance test against it,
//! and reports a [`TestOutcome`]. Build and launch failures are outcomes,
//! not errors; only a missing build tool is an error.

pub mod gradle;
pub mod reports;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{ApiChange, TestOutcome};

pub use gradle::GradleHarness;

/// Environment variable naming the build tool entry point.
pub const BUILD_TOOL_ENV: &str = "GRADLE_HOME";

/// Errors a harness cannot fold into a failing outcome.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("build tool is not configured: environment variable {var} is not set")]
    MissingBuildTool { var: String },
}

/// Runs one generated implementation against its acceptance test.
///
/// Implementations must be safe to call from many units at once.
#[async_trait]
pub trait TestHarness: Send + Sync {
    /// Build and test `source_code` with `build_descriptor` for `change`.
    ///
    /// The returned outcome echoes `change`, `source_code` and
    /// `build_descriptor` back unchanged.
    async fn execute(
        &self,
        change: &ApiChange,
        source_code: &str,
        build_descriptor: &str,
    ) -> Result<TestOutcome, HarnessError>;
}

/// File layout of the throwaway project, relative to its root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLayout {
    pub main_source: PathBuf,
    pub test_source: PathBuf,
    pub build_file: PathBuf,
    /// Directory the build tool writes JUnit XML reports to.
    pub reports_dir: PathBuf,
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self {
            main_source: PathBuf::from("src/main/java/ExampleSpringService.java"),
            test_source: PathBuf::from("src/test/java/ExampleSpringServiceTest.java"),
            build_file: PathBuf::from("build.gradle"),
            reports_dir: PathBuf::from("build/test-results/test"),
        }
    }
}

/// Harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Explicit build tool path. When unset, resolved from `build_tool_env`
    /// on every invocation.
    pub build_tool: Option<PathBuf>,

    /// Environment variable holding the build tool path.
    pub build_tool_env: String,

    /// Arguments passed to the build tool.
    pub args: Vec<String>,

    /// Wall-clock limit for one build tool run in seconds (0 = none).
    pub timeout_secs: u64,

    /// Parent of the per-invocation project directories (default: the
    /// system temporary directory).
    pub work_dir: Option<PathBuf>,

    pub layout: ProjectLayout,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            build_tool: None,
            build_tool_env: BUILD_TOOL_ENV.to_string(),
            args: vec!["test".to_string()],
            timeout_secs: 0,
            work_dir: None,
            layout: ProjectLayout::default(),
        }
    }
}
